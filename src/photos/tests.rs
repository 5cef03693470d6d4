use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::error::{SearchError, ServiceError};

#[derive(Debug, Clone, PartialEq)]
struct RecordedRequest {
    filters: SearchFilter,
    page_size: u32,
    page_token: Option<String>,
}

#[derive(Default)]
struct ScriptedService {
    pages: Mutex<VecDeque<Result<Page, ServiceError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedService {
    fn with_pages(pages: Vec<Result<Page, ServiceError>>) -> Self {
        Self {
            pages: Mutex::new(VecDeque::from(pages)),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl SearchService for ScriptedService {
    async fn search_page(&self, request: PageRequest<'_>) -> Result<Page, ServiceError> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(RecordedRequest {
                filters: request.filters.clone(),
                page_size: request.page_size,
                page_token: request.page_token.map(str::to_string),
            });

        let mut guard = self.pages.lock().expect("lock poisoned");
        guard
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Response("no more scripted pages".to_string())))
    }
}

fn page(prefix: &str, count: usize, next_page_token: Option<&str>) -> Result<Page, ServiceError> {
    Ok(Page {
        items: (0..count)
            .map(|index| MediaItem::new(json!({"id": format!("{prefix}-{index}")})))
            .collect(),
        next_page_token: next_page_token.map(str::to_string),
    })
}

fn ids(items: &[MediaItem]) -> Vec<&str> {
    items.iter().filter_map(MediaItem::id).collect()
}

fn landscapes() -> SearchFilter {
    SearchFilter::new().content_categories(["LANDSCAPES"])
}

#[tokio::test]
async fn cap_within_first_page_issues_single_request() {
    let client = PagedSearchClient::new(ScriptedService::with_pages(vec![page(
        "p1",
        10,
        Some("t1"),
    )]));

    let items = client
        .search(&landscapes(), 10, 7)
        .await
        .expect("search succeeds");

    assert_eq!(items.len(), 10);
    assert_eq!(client.service().requests().len(), 1);
}

#[tokio::test]
async fn concatenates_pages_in_order_until_token_is_absent() {
    let client = PagedSearchClient::new(ScriptedService::with_pages(vec![
        page("p1", 2, Some("t1")),
        page("p2", 2, Some("t2")),
        page("p3", 2, None),
    ]));

    let items = client
        .search(&landscapes(), 2, 100)
        .await
        .expect("search succeeds");

    assert_eq!(
        ids(&items),
        vec!["p1-0", "p1-1", "p2-0", "p2-1", "p3-0", "p3-1"]
    );
    assert_eq!(client.service().requests().len(), 3);
}

#[tokio::test]
async fn last_page_may_overshoot_the_cap() {
    let client = PagedSearchClient::new(ScriptedService::with_pages(vec![
        page("p1", 10, Some("t1")),
        page("p2", 10, Some("t2")),
        page("p3", 10, None),
    ]));

    let items = client
        .search(&landscapes(), 10, 25)
        .await
        .expect("search succeeds");

    assert_eq!(items.len(), 30);
    assert_eq!(client.service().requests().len(), 3);
}

#[tokio::test]
async fn reaching_cap_stops_despite_continuation_token() {
    let client = PagedSearchClient::new(ScriptedService::with_pages(vec![
        page("p1", 5, Some("more")),
        page("p2", 5, None),
    ]));

    let items = client
        .search(&landscapes(), 5, 5)
        .await
        .expect("search succeeds");

    assert_eq!(items.len(), 5);
    assert_eq!(client.service().requests().len(), 1);
}

#[tokio::test]
async fn short_pages_keep_paging_until_cap() {
    let client = PagedSearchClient::new(ScriptedService::with_pages(vec![
        page("p1", 3, Some("t1")),
        page("p2", 3, Some("t2")),
        page("p3", 3, Some("t3")),
        page("p4", 3, None),
    ]));

    let items = client
        .search(&landscapes(), 5, 7)
        .await
        .expect("search succeeds");

    assert_eq!(items.len(), 9);
    assert_eq!(client.service().requests().len(), 3);
}

#[tokio::test]
async fn empty_continuation_token_ends_the_search() {
    let client = PagedSearchClient::new(ScriptedService::with_pages(vec![
        page("p1", 2, Some("")),
        page("p2", 2, None),
    ]));

    let items = client
        .search(&landscapes(), 2, 50)
        .await
        .expect("search succeeds");

    assert_eq!(ids(&items), vec!["p1-0", "p1-1"]);
    assert_eq!(client.service().requests().len(), 1);
}

#[tokio::test]
async fn filters_and_tokens_are_forwarded_on_every_request() {
    let filters = landscapes().media_types(["PHOTO"]);
    let client = PagedSearchClient::new(ScriptedService::with_pages(vec![
        page("p1", 4, Some("t1")),
        page("p2", 4, Some("t2")),
        page("p3", 1, None),
    ]));

    client
        .search(&filters, 4, 20)
        .await
        .expect("search succeeds");

    let requests = client.service().requests();
    assert_eq!(
        requests
            .iter()
            .map(|request| request.page_token.as_deref())
            .collect::<Vec<_>>(),
        vec![None, Some("t1"), Some("t2")]
    );
    assert!(requests.iter().all(|request| request.filters == filters));
    assert!(requests.iter().all(|request| request.page_size == 4));
}

#[tokio::test]
async fn service_error_on_second_page_is_returned_unchanged() {
    let client = PagedSearchClient::new(ScriptedService::with_pages(vec![
        page("p1", 10, Some("t1")),
        Err(ServiceError::Unauthorized("token expired".to_string())),
        page("p3", 10, None),
    ]));

    let err = client
        .search(&landscapes(), 10, 100)
        .await
        .expect_err("search must fail");

    match err {
        SearchError::Service(ServiceError::Unauthorized(message)) => {
            assert_eq!(message, "token expired");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.service().requests().len(), 2);
}

#[tokio::test]
async fn non_positive_sizes_fail_before_any_request() {
    let client = PagedSearchClient::new(ScriptedService::with_pages(vec![page("p1", 1, None)]));

    let err = client
        .search(&landscapes(), 0, 10)
        .await
        .expect_err("page_size 0 must fail");
    assert!(matches!(err, SearchError::Config(message) if message.contains("page_size")));

    let err = client
        .search(&landscapes(), 10, 0)
        .await
        .expect_err("max_items 0 must fail");
    assert!(matches!(err, SearchError::Config(message) if message.contains("max_items")));

    assert!(client.service().requests().is_empty());
}
