//! Core data model: the media item handed from a provider to the widget.
//!
//! A [`MediaItem`] is a normalized reference to one playable file plus
//! whatever derived metadata is known about it. Items are immutable once
//! created except for `metadata`, which the asynchronous enrichment step
//! may fill in after the item has left its provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Broad class of a playable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Classify a file by extension (case-insensitive).
    ///
    /// Returns `None` for anything that is not displayable media.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" | "heic" | "tiff" => Some(Self::Image),
            "mp4" | "mov" | "mkv" | "avi" | "webm" | "m4v" => Some(Self::Video),
            _ => None,
        }
    }

    /// Classify a file name by its extension, if it has one.
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

/// Derived metadata attached to a media item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Capture date, when the catalog knows it.
    pub taken: Option<DateTime<Utc>>,
    /// Raw coordinates (latitude, longitude).
    pub coordinates: Option<(f64, f64)>,
    /// Resolved place name, filled in by enrichment.
    pub place: Option<String>,
    /// Star rating (0-5).
    pub rating: Option<u8>,
    /// Marked as a favorite in the backing catalog.
    pub favorite: bool,
    /// An enrichment lookup is in flight for this item.
    pub enriching: bool,
}

/// Normalized reference to one playable file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Process-unique id, used to correlate async enrichment results.
    pub id: u64,
    /// Opaque locator understood by the hosting environment.
    pub path: String,
    /// Display name of the file.
    pub filename: String,
    /// Image or video.
    pub media_type: MediaType,
    /// Locator of the folder the item was found in.
    pub source_folder: String,
    /// Last-modified stamp, when known.
    pub last_modified: Option<DateTime<Utc>>,
    /// Derived metadata; `None` until something is known.
    pub metadata: Option<MediaMetadata>,
}

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique item id.
pub fn next_item_id() -> u64 {
    NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed)
}

impl MediaItem {
    /// Create an item with a fresh id and no metadata.
    pub fn new(
        path: impl Into<String>,
        filename: impl Into<String>,
        media_type: MediaType,
        source_folder: impl Into<String>,
    ) -> Self {
        Self {
            id: next_item_id(),
            path: path.into(),
            filename: filename.into(),
            media_type,
            source_folder: source_folder.into(),
            last_modified: None,
            metadata: None,
        }
    }

    /// Whether this item is a candidate for place-name enrichment:
    /// it has coordinates but no place yet, and no lookup is in flight.
    pub fn wants_place(&self) -> bool {
        match &self.metadata {
            Some(meta) => meta.coordinates.is_some() && meta.place.is_none() && !meta.enriching,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(MediaType::from_extension("jpg"), Some(MediaType::Image));
        assert_eq!(MediaType::from_extension("JPG"), Some(MediaType::Image));
        assert_eq!(MediaType::from_extension("mp4"), Some(MediaType::Video));
        assert_eq!(MediaType::from_extension("txt"), None);
    }

    #[test]
    fn test_media_type_from_filename() {
        assert_eq!(
            MediaType::from_filename("beach/sunset.jpeg"),
            Some(MediaType::Image)
        );
        assert_eq!(MediaType::from_filename("noextension"), None);
    }

    #[test]
    fn test_item_ids_are_unique() {
        let a = MediaItem::new("/a.jpg", "a.jpg", MediaType::Image, "/");
        let b = MediaItem::new("/b.jpg", "b.jpg", MediaType::Image, "/");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_wants_place() {
        let mut item = MediaItem::new("/a.jpg", "a.jpg", MediaType::Image, "/");
        assert!(!item.wants_place());

        item.metadata = Some(MediaMetadata {
            coordinates: Some((51.5, -0.1)),
            ..Default::default()
        });
        assert!(item.wants_place());

        item.metadata.as_mut().unwrap().enriching = true;
        assert!(!item.wants_place());

        item.metadata.as_mut().unwrap().enriching = false;
        item.metadata.as_mut().unwrap().place = Some("London".to_string());
        assert!(!item.wants_place());
    }
}
