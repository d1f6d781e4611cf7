//! Catalog API data transfer objects.
//!
//! These types match exactly what the index API returns. Do not use
//! them outside the catalog module - convert to the `source` types via
//! the adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `GET /items`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<ItemDto>,
    /// Total items matching the query, across all pages.
    pub total: u64,
}

/// One indexed media item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemDto {
    pub path: String,
    pub filename: String,
    /// Capture timestamp, RFC 3339.
    pub taken: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub place: Option<String>,
    pub rating: Option<u8>,
    #[serde(default)]
    pub favorite: bool,
    /// Whether the index already resolved a place name.
    #[serde(default)]
    pub geocoded: bool,
}

/// Response of `GET /folders`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoldersResponse {
    #[serde(default)]
    pub folders: Vec<String>,
}

/// Error body the API returns on failed requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_response_parses() {
        let json = r#"{
            "items": [{
                "path": "/photos/2021/beach.jpg",
                "filename": "beach.jpg",
                "taken": "2021-07-14T12:30:00Z",
                "latitude": 43.26,
                "longitude": -2.93,
                "place": null,
                "rating": 4,
                "favorite": true
            }],
            "total": 812
        }"#;
        let response: ItemsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.total, 812);
        assert_eq!(response.items.len(), 1);
        let item = &response.items[0];
        assert_eq!(item.filename, "beach.jpg");
        assert!(item.favorite);
        assert!(!item.geocoded);
        assert_eq!(item.taken.unwrap().to_rfc3339(), "2021-07-14T12:30:00+00:00");
    }

    #[test]
    fn test_missing_items_defaults_empty() {
        let response: ItemsResponse = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(response.items.is_empty());
    }
}
