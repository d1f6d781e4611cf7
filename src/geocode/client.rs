//! Reverse-geocoding HTTP client.
//!
//! Nominatim requires a User-Agent header and asks for no more than
//! one request per second; the provider's look-ahead scheduling keeps
//! the request rate naturally low.

use async_trait::async_trait;

use super::dto;
use crate::error::FetchError;
use crate::source::{Geocoder, Place};

const USER_AGENT: &str = concat!("Slideflow/", env!("CARGO_PKG_VERSION"));

/// HTTP client for a Nominatim-compatible reverse-geocoding API.
pub struct GeocodeClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GeocodeClient {
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
}

#[async_trait]
impl Geocoder for GeocodeClient {
    async fn geocode(&self, lat: f64, lon: f64) -> Result<Place, FetchError> {
        let url = format!(
            "{}/reverse?format=jsonv2&lat={lat}&lon={lon}&zoom=10",
            self.base_url
        );
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Api(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("unknown")
            )));
        }

        let body = response
            .json::<dto::ReverseResponse>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        Ok(Place {
            city: body.address.locality().cloned(),
            country: body.address.country.clone(),
            display_name: body.display_name,
        })
    }
}
