//! Trait definitions for the external collaborators.
//!
//! The engine talks to its host through three narrow request/response
//! capabilities: folder browsing, catalog queries, and reverse
//! geocoding. These traits enable dependency injection and mocking for
//! tests; production code wires in the real implementations
//! ([`fs::FsBrowser`], [`crate::catalog::CatalogClient`],
//! [`crate::geocode::GeocodeClient`]).

pub mod fs;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::model::MediaType;

/// One child of a browsed folder.
#[derive(Debug, Clone)]
pub struct FolderEntry {
    /// Opaque locator for the child.
    pub locator: String,
    /// Human-readable name.
    pub display_name: String,
    /// Whether the child is itself a folder.
    pub is_folder: bool,
    /// Media class of a file child; `None` for non-media files.
    pub media_class: Option<MediaType>,
}

impl FolderEntry {
    /// A media or plain file entry, classified by its name.
    pub fn file(locator: impl Into<String>, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let media_class = MediaType::from_filename(&display_name);
        Self {
            locator: locator.into(),
            display_name,
            is_folder: false,
            media_class,
        }
    }

    /// A subfolder entry.
    pub fn folder(locator: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            display_name: display_name.into(),
            is_folder: true,
            media_class: None,
        }
    }
}

/// Result of browsing one folder. Empty or missing folders yield an
/// empty listing, not an error.
#[derive(Debug, Clone, Default)]
pub struct FolderListing {
    pub children: Vec<FolderEntry>,
}

/// Folder browsing capability of the hosting environment.
#[async_trait]
pub trait FolderBrowser: Send + Sync {
    /// List the children of one folder.
    async fn browse(&self, folder: &str) -> Result<FolderListing, FetchError>;
}

/// Requested ordering of a catalog query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
    /// Random sample of the matching items.
    #[default]
    Random,
    /// Ordered by capture date.
    TakenDate,
}

/// Filter and paging parameters for a catalog query.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Number of items requested.
    pub count: usize,
    /// Restrict to one folder subtree.
    pub folder: Option<String>,
    /// Restrict to one media class.
    pub file_type: Option<MediaType>,
    /// Requested ordering.
    pub order: QueryOrder,
}

/// One item as reported by the backing catalog index.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub path: String,
    pub filename: String,
    pub taken: Option<DateTime<Utc>>,
    pub coordinates: Option<(f64, f64)>,
    pub place: Option<String>,
    pub rating: Option<u8>,
    pub favorite: bool,
    /// Whether the index already resolved a place for the coordinates.
    pub geocoded: bool,
}

/// One page of catalog results.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub items: Vec<CatalogEntry>,
    /// Total items matching the query, not just this page.
    pub total_matches: u64,
}

/// Query capability of an externally maintained catalog index.
#[async_trait]
pub trait CatalogIndex: Send + Sync {
    /// Request a page of items.
    async fn query(&self, query: &CatalogQuery) -> Result<CatalogPage, FetchError>;

    /// Enumerate the folders known to the index.
    async fn folders(&self) -> Result<Vec<String>, FetchError>;
}

/// A resolved place for a pair of coordinates.
#[derive(Debug, Clone, Default)]
pub struct Place {
    pub city: Option<String>,
    pub country: Option<String>,
    /// Free-form fallback description.
    pub display_name: String,
}

impl Place {
    /// Short label for display: "City, Country" when both are known,
    /// otherwise whatever the geocoder gave us.
    pub fn label(&self) -> String {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => format!("{city}, {country}"),
            (Some(city), None) => city.clone(),
            _ => self.display_name.clone(),
        }
    }
}

/// Reverse-geocoding capability.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve coordinates to a place.
    async fn geocode(&self, lat: f64, lon: f64) -> Result<Place, FetchError>;
}

/// Scripted collaborator implementations for tests.
#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use crate::provider::PauseToken;

    /// Folder browser backed by a scripted tree.
    ///
    /// Unknown folders browse as empty listings, matching the contract
    /// that a missing folder is zero items rather than an error.
    pub struct ScriptedBrowser {
        folders: HashMap<String, FolderListing>,
        failing: HashSet<String>,
        calls: Mutex<Vec<String>>,
        /// Trip this pause token once the given number of browse calls
        /// has been served. Exercises cooperative scan suspension.
        pause_after: Mutex<Option<(usize, PauseToken)>>,
    }

    impl ScriptedBrowser {
        pub fn new() -> Self {
            Self {
                folders: HashMap::new(),
                failing: HashSet::new(),
                calls: Mutex::new(Vec::new()),
                pause_after: Mutex::new(None),
            }
        }

        /// Script the listing for one folder.
        pub fn folder(mut self, path: &str, children: Vec<FolderEntry>) -> Self {
            self.folders
                .insert(path.to_string(), FolderListing { children });
            self
        }

        /// Make browsing the given folder fail with a network error.
        pub fn failing(mut self, path: &str) -> Self {
            self.failing.insert(path.to_string());
            self
        }

        /// Pause the given token after `calls` successful browses.
        pub fn pause_after(self, calls: usize, token: PauseToken) -> Self {
            *self.pause_after.lock().unwrap() = Some((calls, token));
            self
        }

        /// Folders browsed so far, in order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FolderBrowser for ScriptedBrowser {
        async fn browse(&self, folder: &str) -> Result<FolderListing, FetchError> {
            if self.failing.contains(folder) {
                return Err(FetchError::Network(format!("browse failed: {folder}")));
            }
            self.calls.lock().unwrap().push(folder.to_string());

            let served = self.calls.lock().unwrap().len();
            if let Some((_, token)) = self
                .pause_after
                .lock()
                .unwrap()
                .take_if(|(after, _)| served >= *after)
            {
                token.pause();
            }

            Ok(self.folders.get(folder).cloned().unwrap_or_default())
        }
    }

    /// Catalog index backed by a scripted entry list.
    ///
    /// Queries filter deterministically by folder prefix and media
    /// class and return the first `count` matches in scripted order.
    pub struct ScriptedCatalog {
        entries: Mutex<Vec<CatalogEntry>>,
        folders: Vec<String>,
        queries: Mutex<usize>,
        fail_after: Option<usize>,
    }

    impl ScriptedCatalog {
        pub fn new(entries: Vec<CatalogEntry>) -> Self {
            Self {
                entries: Mutex::new(entries),
                folders: Vec::new(),
                queries: Mutex::new(0),
                fail_after: None,
            }
        }

        pub fn with_folders(mut self, folders: Vec<String>) -> Self {
            self.folders = folders;
            self
        }

        /// Make every query past the first `n` fail with a network
        /// error.
        pub fn failing_after(mut self, n: usize) -> Self {
            self.fail_after = Some(n);
            self
        }

        /// Add entries after construction, simulating a growing index.
        pub fn push_entries(&self, mut extra: Vec<CatalogEntry>) {
            self.entries.lock().unwrap().append(&mut extra);
        }

        pub fn query_count(&self) -> usize {
            *self.queries.lock().unwrap()
        }
    }

    #[async_trait]
    impl CatalogIndex for ScriptedCatalog {
        async fn query(&self, query: &CatalogQuery) -> Result<CatalogPage, FetchError> {
            let served = {
                let mut queries = self.queries.lock().unwrap();
                *queries += 1;
                *queries
            };
            if let Some(n) = self.fail_after
                && served > n
            {
                return Err(FetchError::Network("index unreachable".to_string()));
            }
            let entries = self.entries.lock().unwrap();
            let matches: Vec<CatalogEntry> = entries
                .iter()
                .filter(|e| match &query.folder {
                    Some(folder) => e.path.starts_with(folder.as_str()),
                    None => true,
                })
                .filter(|e| match query.file_type {
                    Some(t) => MediaType::from_filename(&e.filename) == Some(t),
                    None => true,
                })
                .cloned()
                .collect();
            let total = matches.len() as u64;
            Ok(CatalogPage {
                items: matches.into_iter().take(query.count).collect(),
                total_matches: total,
            })
        }

        async fn folders(&self) -> Result<Vec<String>, FetchError> {
            Ok(self.folders.clone())
        }
    }

    /// Geocoder answering from a fixed table keyed by rounded coordinates.
    pub struct ScriptedGeocoder {
        places: HashMap<(i64, i64), Place>,
        fail: bool,
        calls: Mutex<usize>,
    }

    impl ScriptedGeocoder {
        pub fn new() -> Self {
            Self {
                places: HashMap::new(),
                fail: false,
                calls: Mutex::new(0),
            }
        }

        pub fn place(mut self, lat: f64, lon: f64, city: &str, country: &str) -> Self {
            self.places.insert(
                Self::key(lat, lon),
                Place {
                    city: Some(city.to_string()),
                    country: Some(country.to_string()),
                    display_name: format!("{city}, {country}"),
                },
            );
            self
        }

        pub fn always_failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        pub fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        fn key(lat: f64, lon: f64) -> (i64, i64) {
            ((lat * 1e4).round() as i64, (lon * 1e4).round() as i64)
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        async fn geocode(&self, lat: f64, lon: f64) -> Result<Place, FetchError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(FetchError::Network("geocoder unreachable".to_string()));
            }
            Ok(self
                .places
                .get(&Self::key(lat, lon))
                .cloned()
                .unwrap_or_default())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_scripted_browser_unknown_folder_is_empty() {
            let browser = ScriptedBrowser::new();
            let listing = browser.browse("/nowhere").await.unwrap();
            assert!(listing.children.is_empty());
        }

        #[tokio::test]
        async fn test_scripted_browser_failure() {
            let browser = ScriptedBrowser::new().failing("/bad");
            assert!(browser.browse("/bad").await.is_err());
        }

        #[tokio::test]
        async fn test_scripted_catalog_filters() {
            let entry = |path: &str| CatalogEntry {
                path: path.to_string(),
                filename: path.rsplit('/').next().unwrap().to_string(),
                taken: None,
                coordinates: None,
                place: None,
                rating: None,
                favorite: false,
                geocoded: false,
            };
            let catalog =
                ScriptedCatalog::new(vec![entry("/a/x.jpg"), entry("/a/y.mp4"), entry("/b/z.jpg")]);

            let page = catalog
                .query(&CatalogQuery {
                    count: 10,
                    folder: Some("/a".to_string()),
                    file_type: Some(MediaType::Image),
                    order: QueryOrder::Random,
                })
                .await
                .unwrap();
            assert_eq!(page.items.len(), 1);
            assert_eq!(page.items[0].path, "/a/x.jpg");
        }

        #[tokio::test]
        async fn test_scripted_geocoder() {
            let geo = ScriptedGeocoder::new().place(48.8566, 2.3522, "Paris", "France");
            let place = geo.geocode(48.8566, 2.3522).await.unwrap();
            assert_eq!(place.label(), "Paris, France");
            assert_eq!(geo.call_count(), 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_entry_classification() {
        let entry = FolderEntry::file("/p/a.jpg", "a.jpg");
        assert_eq!(entry.media_class, Some(MediaType::Image));
        assert!(!entry.is_folder);

        let entry = FolderEntry::file("/p/readme.txt", "readme.txt");
        assert_eq!(entry.media_class, None);

        let entry = FolderEntry::folder("/p/sub", "sub");
        assert!(entry.is_folder);
    }

    #[test]
    fn test_place_label_fallbacks() {
        let place = Place {
            city: None,
            country: Some("France".to_string()),
            display_name: "Somewhere in France".to_string(),
        };
        assert_eq!(place.label(), "Somewhere in France");

        let place = Place {
            city: Some("Lyon".to_string()),
            country: None,
            display_name: String::new(),
        };
        assert_eq!(place.label(), "Lyon");
    }
}
