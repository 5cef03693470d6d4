use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::photos::{MediaItem, Page, PageRequest, SearchFilter, SearchService};

const DEFAULT_API_BASE_URL: &str = "https://photoslibrary.googleapis.com";

#[derive(Debug, Clone)]
/// Runtime configuration for [`GooglePhotosService`].
pub struct GooglePhotosConfig {
    /// OAuth access token with the `photoslibrary.readonly` scope.
    pub access_token: String,
    /// Optional base URL override for proxies or test servers.
    pub api_base_url: Option<String>,
    /// Optional per-request timeout.
    pub timeout: Option<Duration>,
}

impl GooglePhotosConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_base_url: None,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
/// Photos Library `mediaItems:search` implementing [`SearchService`].
///
/// Token acquisition and refresh happen elsewhere; this only attaches the
/// bearer token it was given.
pub struct GooglePhotosService {
    client: Client,
    config: GooglePhotosConfig,
}

impl GooglePhotosService {
    pub fn new(config: GooglePhotosConfig) -> Result<Self, ServiceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|err| ServiceError::Request(err.to_string()))?;

        Ok(Self { client, config })
    }

    /// Creates a service using `GOOGLE_PHOTOS_ACCESS_TOKEN` from the environment.
    pub fn from_env() -> Result<Self, ServiceError> {
        let access_token = std::env::var("GOOGLE_PHOTOS_ACCESS_TOKEN").map_err(|_| {
            ServiceError::Unauthorized("GOOGLE_PHOTOS_ACCESS_TOKEN is not set".to_string())
        })?;

        Self::new(GooglePhotosConfig::new(access_token))
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/v1/mediaItems:search")
    }
}

#[async_trait]
impl SearchService for GooglePhotosService {
    async fn search_page(&self, request: PageRequest<'_>) -> Result<Page, ServiceError> {
        let body = build_request(&request);
        debug!(endpoint = %self.endpoint(), page_size = body.page_size, "POST mediaItems:search");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| ServiceError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = extract_api_error(response).await;
            warn!(%status, "photos search failed");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ServiceError::Unauthorized(message)
                }
                _ => ServiceError::Request(message),
            });
        }

        let payload = response
            .json::<SearchResponseBody>()
            .await
            .map_err(|err| ServiceError::Response(err.to_string()))?;

        Ok(normalize_response(payload))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequestBody<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
    #[serde(skip_serializing_if = "filters_are_empty")]
    filters: &'a SearchFilter,
}

fn filters_are_empty(filters: &&SearchFilter) -> bool {
    filters.is_empty()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponseBody {
    #[serde(default)]
    media_items: Vec<MediaItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleApiError,
}

#[derive(Debug, Deserialize)]
struct GoogleApiError {
    code: Option<Value>,
    message: Option<String>,
    status: Option<String>,
}

fn build_request<'a>(request: &PageRequest<'a>) -> SearchRequestBody<'a> {
    SearchRequestBody {
        page_size: request.page_size,
        page_token: request.page_token,
        filters: request.filters,
    }
}

fn normalize_response(response: SearchResponseBody) -> Page {
    Page {
        items: response.media_items,
        next_page_token: response.next_page_token,
    }
}

async fn extract_api_error(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(parsed) = serde_json::from_str::<GoogleErrorEnvelope>(&body) {
        let code = parsed
            .error
            .code
            .map(|value| match value {
                Value::String(value) => value,
                other => other.to_string(),
            })
            .unwrap_or_else(|| status.as_u16().to_string());
        let error_status = parsed
            .error
            .status
            .unwrap_or_else(|| status.to_string().to_uppercase());
        let message = parsed
            .error
            .message
            .unwrap_or_else(|| "unknown photos api error".to_string());

        return format!("photos api error {code} {error_status}: {message}");
    }

    if body.is_empty() {
        format!("photos api request failed ({status})")
    } else {
        format!("photos api request failed ({status}): {body}")
    }
}
