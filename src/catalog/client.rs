//! Catalog index HTTP client.

use async_trait::async_trait;

use super::{adapter, dto};
use crate::error::FetchError;
use crate::model::MediaType;
use crate::source::{CatalogIndex, CatalogPage, CatalogQuery, QueryOrder};

const USER_AGENT: &str = concat!("Slideflow/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the catalog index API.
pub struct CatalogClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    fn items_url(&self, query: &CatalogQuery) -> String {
        let mut url = format!("{}/items?count={}", self.base_url, query.count);
        if let Some(folder) = &query.folder {
            url.push_str("&folder=");
            url.push_str(&urlencode(folder));
        }
        if let Some(file_type) = query.file_type {
            url.push_str(match file_type {
                MediaType::Image => "&type=image",
                MediaType::Video => "&type=video",
            });
        }
        url.push_str(match query.order {
            QueryOrder::Random => "&order=random",
            QueryOrder::TakenDate => "&order=taken",
        });
        url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            if let Ok(error) = response.json::<dto::ApiError>().await {
                return Err(FetchError::Api(error.error));
            }
            return Err(FetchError::Api(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("unknown")
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl CatalogIndex for CatalogClient {
    async fn query(&self, query: &CatalogQuery) -> Result<CatalogPage, FetchError> {
        let url = self.items_url(query);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        // A folder the index does not know yields zero items, not an
        // error.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(CatalogPage::default());
        }
        let response = Self::check(response).await?;

        let body = response
            .json::<dto::ItemsResponse>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(adapter::to_page(body))
    }

    async fn folders(&self) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/folders", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let response = Self::check(response).await?;

        let body = response
            .json::<dto::FoldersResponse>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(body.folders)
    }
}

/// Minimal percent-encoding for query parameter values.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
