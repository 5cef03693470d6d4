use tracing::debug;

use crate::error::SearchError;
use crate::photos::{MediaItem, Page, PageRequest, SearchFilter, SearchService};

/// Cursor-based pagination over a [`SearchService`], bounded by an item cap.
#[derive(Debug, Clone)]
pub struct PagedSearchClient<S> {
    service: S,
}

impl<S> PagedSearchClient<S>
where
    S: SearchService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn into_inner(self) -> S {
        self.service
    }

    /// Fetches pages until `max_items` is reached or the service has no more.
    ///
    /// The cap is checked after a whole page is appended, so the result may
    /// exceed `max_items` by up to one page. Pages are never truncated. Any
    /// service failure aborts the search and the partial result is dropped.
    pub async fn search(
        &self,
        filters: &SearchFilter,
        page_size: u32,
        max_items: u32,
    ) -> Result<Vec<MediaItem>, SearchError> {
        if page_size == 0 {
            return Err(SearchError::Config("page_size must be positive".to_string()));
        }
        if max_items == 0 {
            return Err(SearchError::Config("max_items must be positive".to_string()));
        }

        let mut session = SearchSession::new(max_items);

        loop {
            let request = PageRequest {
                filters,
                page_size,
                page_token: session.page_token.as_deref(),
            };

            debug!(
                page = session.pages + 1,
                page_size,
                continued = request.page_token.is_some(),
                "requesting search page"
            );

            let page = self.service.search_page(request).await?;
            session.absorb(page);

            if session.is_finished() {
                break;
            }
        }

        debug!(
            pages = session.pages,
            items = session.items.len(),
            max_items,
            "search finished"
        );

        Ok(session.items)
    }
}

struct SearchSession {
    items: Vec<MediaItem>,
    page_token: Option<String>,
    max_items: usize,
    pages: u32,
}

impl SearchSession {
    fn new(max_items: u32) -> Self {
        Self {
            items: Vec::new(),
            page_token: None,
            max_items: max_items as usize,
            pages: 0,
        }
    }

    fn absorb(&mut self, page: Page) {
        self.pages += 1;
        self.items.extend(page.items);
        self.page_token = page.next_page_token.filter(|token| !token.is_empty());
    }

    fn is_finished(&self) -> bool {
        self.items.len() >= self.max_items || self.page_token.is_none()
    }
}
