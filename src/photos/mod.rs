//! Paged media search against a photo library.
//!
//! - [`SearchFilter`] builds the filter object sent with every page request
//! - [`SearchService`] is the authenticated remote capability, one call per page
//! - [`PagedSearchClient`] drives the continuation-token loop up to a result cap
//! - [`GooglePhotosService`] implements [`SearchService`] over the Photos Library API

mod client;
mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ServiceError;

pub use client::PagedSearchClient;
pub use google::{GooglePhotosConfig, GooglePhotosService};

/// Filter criteria keyed by filter name (`contentFilter`, `dateFilter`, ...).
///
/// The value is passed through to the service untouched; builder methods
/// only exist so callers do not have to spell out the nested JSON by hand.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchFilter {
    filters: Map<String, Value>,
}

/// Calendar date as understood by the photo library. Zero means "any" for
/// `month` and `day`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDate {
    pub year: u32,
    pub month: u32,
    pub day: u32,
}

impl FilterDate {
    pub fn new(year: u32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(filters: Map<String, Value>) -> Self {
        Self { filters }
    }

    pub fn content_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let section = self.section_mut("contentFilter");
        append_strings(section, "includedContentCategories", categories);
        self
    }

    pub fn excluded_content_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let section = self.section_mut("contentFilter");
        append_strings(section, "excludedContentCategories", categories);
        self
    }

    pub fn date(mut self, date: FilterDate) -> Self {
        let section = self.section_mut("dateFilter");
        append_values(section, "dates", [json!(date)]);
        self
    }

    pub fn date_range(mut self, start: FilterDate, end: FilterDate) -> Self {
        let section = self.section_mut("dateFilter");
        append_values(
            section,
            "ranges",
            [json!({ "startDate": start, "endDate": end })],
        );
        self
    }

    pub fn media_types<I, S>(mut self, media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let section = self.section_mut("mediaTypeFilter");
        append_strings(section, "mediaTypes", media_types);
        self
    }

    pub fn include_archived_media(mut self, include: bool) -> Self {
        self.filters
            .insert("includeArchivedMedia".to_string(), Value::Bool(include));
        self
    }

    /// Sets an arbitrary filter, replacing any previous value under `name`.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.filters.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.filters.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.filters
    }

    fn section_mut(&mut self, name: &str) -> &mut Map<String, Value> {
        let entry = self
            .filters
            .entry(name.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        entry
            .as_object_mut()
            .expect("filter section was just set to an object")
    }
}

fn append_strings<I, S>(section: &mut Map<String, Value>, key: &str, values: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    append_values(
        section,
        key,
        values.into_iter().map(|value| Value::String(value.into())),
    );
}

fn append_values<I>(section: &mut Map<String, Value>, key: &str, values: I)
where
    I: IntoIterator<Item = Value>,
{
    let entry = section
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match entry {
        Value::Array(existing) => existing.extend(values),
        other => *other = Value::Array(values.into_iter().collect()),
    }
}

/// One matched media object. Kept as the raw record the service returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaItem(Value);

impl MediaItem {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn id(&self) -> Option<&str> {
        self.field("id")
    }

    pub fn base_url(&self) -> Option<&str> {
        self.field("baseUrl")
    }

    pub fn filename(&self) -> Option<&str> {
        self.field("filename")
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.field("mimeType")
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}

/// A single page request. `page_token` is `None` on the first request.
#[derive(Clone, Copy, Debug)]
pub struct PageRequest<'a> {
    pub filters: &'a SearchFilter,
    pub page_size: u32,
    pub page_token: Option<&'a str>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub items: Vec<MediaItem>,
    pub next_page_token: Option<String>,
}

/// Already-authenticated search capability. One call returns one page.
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search_page(&self, request: PageRequest<'_>) -> Result<Page, ServiceError>;
}

#[cfg(test)]
mod tests;
