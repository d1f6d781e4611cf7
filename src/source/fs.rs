//! Filesystem implementation of the folder-browse capability.
//!
//! Used by the CLI to run the engine against a local directory tree.
//! I/O problems (missing folder, permission denied) browse as empty
//! listings per the contract; they are logged, not raised.

use async_trait::async_trait;

use super::{FolderBrowser, FolderEntry, FolderListing};
use crate::error::FetchError;
use crate::model::MediaType;

/// Folder browser over the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsBrowser;

impl FsBrowser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FolderBrowser for FsBrowser {
    async fn browse(&self, folder: &str) -> Result<FolderListing, FetchError> {
        let mut dir = match tokio::fs::read_dir(folder).await {
            Ok(dir) => dir,
            Err(e) => {
                tracing::debug!("browse of {folder} yielded nothing: {e}");
                return Ok(FolderListing::default());
            }
        };

        let mut children = Vec::new();
        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let locator = entry.path().to_string_lossy().to_string();
            let is_folder = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            children.push(FolderEntry {
                media_class: if is_folder {
                    None
                } else {
                    MediaType::from_filename(&name)
                },
                locator,
                display_name: name,
                is_folder,
            });
        }

        Ok(FolderListing { children })
    }
}
