//! The two trivial providers: a single fixed file and a flat folder.
//!
//! Present mainly for contract completeness; the interesting sampling
//! lives in [`super::subfolder`] and [`super::indexed`].

use std::sync::Arc;

use async_trait::async_trait;

use super::{DebugCounters, MediaProvider, ProviderState};
use crate::error::ProviderError;
use crate::model::{MediaItem, MediaType};
use crate::source::FolderBrowser;

/// Provider for a single fixed media file.
pub struct SingleMediaProvider {
    path: String,
    state: ProviderState,
    current: Option<MediaItem>,
}

impl SingleMediaProvider {
    pub fn new(path: String) -> Self {
        Self {
            path,
            state: ProviderState::Uninitialized,
            current: None,
        }
    }

    fn connect(&mut self) -> Result<(), ProviderError> {
        self.state = ProviderState::Loading;
        if self.path.is_empty() {
            self.state = ProviderState::Error;
            return Err(ProviderError::configuration("single source needs a file path"));
        }

        let filename = self
            .path
            .rsplit('/')
            .next()
            .unwrap_or(self.path.as_str())
            .to_string();
        let media_type = MediaType::from_filename(&filename).unwrap_or(MediaType::Image);
        let source_folder = self
            .path
            .rsplit_once('/')
            .map(|(folder, _)| folder.to_string())
            .unwrap_or_default();

        self.current = Some(MediaItem::new(
            self.path.clone(),
            filename,
            media_type,
            source_folder,
        ));
        self.state = ProviderState::Ready;
        Ok(())
    }
}

#[async_trait]
impl MediaProvider for SingleMediaProvider {
    async fn initialize(&mut self) -> Result<(), ProviderError> {
        self.connect()
    }

    async fn next_item(&mut self) -> Option<MediaItem> {
        if self.state != ProviderState::Ready {
            return None;
        }
        // A single file just keeps showing.
        self.current.clone()
    }

    async fn previous_item(&mut self) -> Option<MediaItem> {
        None
    }

    fn current_item(&self) -> Option<&MediaItem> {
        self.current.as_ref()
    }

    fn state(&self) -> ProviderState {
        self.state
    }

    fn can_advance(&self) -> bool {
        false
    }

    fn can_go_back(&self) -> bool {
        false
    }

    fn pause(&mut self) {}

    async fn resume(&mut self) {}

    fn disconnect(&mut self) {
        self.current = None;
        self.state = ProviderState::Uninitialized;
    }

    async fn reconnect(&mut self) -> Result<(), ProviderError> {
        self.connect()
    }

    fn counters(&self) -> DebugCounters {
        DebugCounters {
            queue_len: usize::from(self.current.is_some()),
            ..Default::default()
        }
    }
}

/// Provider cycling through the media directly inside one folder.
///
/// Items are shown in filename order and wrap around at the end; a
/// small wall-display folder should loop rather than stop.
pub struct SimpleFolderProvider {
    root: String,
    browser: Arc<dyn FolderBrowser>,
    state: ProviderState,
    items: Vec<MediaItem>,
    cursor: usize,
}

impl SimpleFolderProvider {
    pub fn new(root: String, browser: Arc<dyn FolderBrowser>) -> Self {
        Self {
            root,
            browser,
            state: ProviderState::Uninitialized,
            items: Vec::new(),
            cursor: 0,
        }
    }

    async fn connect(&mut self) -> Result<(), ProviderError> {
        self.state = ProviderState::Loading;
        if self.root.is_empty() {
            self.state = ProviderState::Error;
            return Err(ProviderError::configuration("folder source needs a root path"));
        }

        let listing = match self.browser.browse(&self.root).await {
            Ok(listing) => listing,
            Err(e) => {
                self.state = ProviderState::Error;
                return Err(e.into());
            }
        };

        let mut items: Vec<MediaItem> = listing
            .children
            .iter()
            .filter(|c| !c.is_folder)
            .filter_map(|c| {
                c.media_class.map(|t| {
                    MediaItem::new(c.locator.clone(), c.display_name.clone(), t, self.root.clone())
                })
            })
            .collect();
        items.sort_by(|a, b| a.filename.cmp(&b.filename));

        if items.is_empty() {
            self.state = ProviderState::Error;
            return Err(ProviderError::empty(format!("no media in {}", self.root)));
        }

        self.items = items;
        self.cursor = 0;
        self.state = ProviderState::Ready;
        tracing::info!("folder provider ready with {} items", self.items.len());
        Ok(())
    }
}

#[async_trait]
impl MediaProvider for SimpleFolderProvider {
    async fn initialize(&mut self) -> Result<(), ProviderError> {
        self.connect().await
    }

    async fn next_item(&mut self) -> Option<MediaItem> {
        if self.state != ProviderState::Ready || self.items.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.items.len();
        self.items.get(self.cursor).cloned()
    }

    async fn previous_item(&mut self) -> Option<MediaItem> {
        if self.state != ProviderState::Ready || self.items.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + self.items.len() - 1) % self.items.len();
        self.items.get(self.cursor).cloned()
    }

    fn current_item(&self) -> Option<&MediaItem> {
        if self.state != ProviderState::Ready {
            return None;
        }
        self.items.get(self.cursor)
    }

    fn state(&self) -> ProviderState {
        self.state
    }

    fn can_advance(&self) -> bool {
        self.items.len() > 1
    }

    fn can_go_back(&self) -> bool {
        self.items.len() > 1
    }

    fn pause(&mut self) {}

    async fn resume(&mut self) {}

    fn disconnect(&mut self) {
        self.items.clear();
        self.cursor = 0;
        self.state = ProviderState::Uninitialized;
    }

    async fn reconnect(&mut self) -> Result<(), ProviderError> {
        self.connect().await
    }

    fn counters(&self) -> DebugCounters {
        DebugCounters {
            queue_len: self.items.len(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FolderEntry;
    use crate::source::mocks::ScriptedBrowser;

    #[tokio::test]
    async fn test_single_provider() {
        let mut provider = SingleMediaProvider::new("/photos/cat.jpg".to_string());
        assert_eq!(provider.state(), ProviderState::Uninitialized);

        provider.initialize().await.unwrap();
        assert_eq!(provider.state(), ProviderState::Ready);

        let current = provider.current_item().unwrap();
        assert_eq!(current.filename, "cat.jpg");
        assert_eq!(current.source_folder, "/photos");
        assert!(!provider.can_advance());

        // next keeps showing the same item
        let next = provider.next_item().await.unwrap();
        assert_eq!(next.path, "/photos/cat.jpg");
    }

    #[tokio::test]
    async fn test_single_provider_empty_path_is_config_error() {
        let mut provider = SingleMediaProvider::new(String::new());
        let err = provider.initialize().await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert_eq!(provider.state(), ProviderState::Error);
    }

    #[tokio::test]
    async fn test_folder_provider_wraps() {
        let browser = ScriptedBrowser::new().folder(
            "/wall",
            vec![
                FolderEntry::file("/wall/b.jpg", "b.jpg"),
                FolderEntry::file("/wall/a.jpg", "a.jpg"),
                FolderEntry::file("/wall/notes.txt", "notes.txt"),
            ],
        );
        let mut provider = SimpleFolderProvider::new("/wall".to_string(), Arc::new(browser));
        provider.initialize().await.unwrap();

        // Sorted by filename, non-media filtered out.
        assert_eq!(provider.current_item().unwrap().filename, "a.jpg");
        assert_eq!(provider.next_item().await.unwrap().filename, "b.jpg");
        assert_eq!(provider.next_item().await.unwrap().filename, "a.jpg"); // wrapped
        assert_eq!(provider.previous_item().await.unwrap().filename, "b.jpg");
    }

    #[tokio::test]
    async fn test_folder_provider_empty_is_fatal_on_initialize() {
        let browser = ScriptedBrowser::new();
        let mut provider = SimpleFolderProvider::new("/empty".to_string(), Arc::new(browser));
        let err = provider.initialize().await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResult(_)));
        assert_eq!(provider.state(), ProviderState::Error);
    }
}
