//! The media-provider contract and its shared state machine.
//!
//! A provider turns one configured media source into a navigable
//! sequence of [`MediaItem`]s. Every concrete source (single file, flat
//! folder, random subtree, indexed catalog) sits behind the one
//! [`MediaProvider`] trait and is selected once at construction from
//! the configuration tag.
//!
//! # State machine
//!
//! ```text
//! Uninitialized --initialize()--> Loading --success--> Ready
//!                                    |
//!                                    +-----failure---> Error
//! Ready|Error --reconnect()--> Loading
//! ```
//!
//! Transitions are monotonic except the explicit `reconnect()` path; a
//! provider never silently leaves `Ready`. `pause()`/`resume()` toggle
//! background work (scanning, enrichment) without a state transition.

pub mod indexed;
pub mod simple;
pub mod subfolder;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::cache::SharedScanCache;
use crate::config::{Config, SourceKind};
use crate::error::ProviderError;
use crate::model::MediaItem;
use crate::source::{CatalogIndex, FolderBrowser, Geocoder};

/// Lifecycle state of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Uninitialized,
    Loading,
    Ready,
    Error,
}

/// Read-only counters exposed for diagnostics overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugCounters {
    /// Items waiting in the live queue.
    pub queue_len: usize,
    /// Entries in the shared navigation history (filled by the controller).
    pub history_len: usize,
    /// Folders discovered by the current scan.
    pub discovered_folders: usize,
    /// Locators in the session exclusion set.
    pub excluded: usize,
    /// Items enriched with a place name so far.
    pub enriched: usize,
}

/// Cooperative pause flag shared between a provider and whoever is
/// driving it.
///
/// The flag is checked at suspension points (before each folder fetch,
/// before scheduling enrichment); an in-flight fetch completes but is
/// not followed up.
#[derive(Debug, Clone, Default)]
pub struct PauseToken(Arc<AtomicBool>);

impl PauseToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Pluggable strategy turning a configured media source into a
/// navigable item sequence.
#[async_trait]
pub trait MediaProvider: Send {
    /// Build the initial queue and current item.
    ///
    /// Moves `Uninitialized -> Loading -> Ready` on success; on failure
    /// the provider lands in `Error` with the returned diagnostic.
    async fn initialize(&mut self) -> Result<(), ProviderError>;

    /// Advance to the next item. Valid only in `Ready`; an exhausted
    /// queue yields `None` ("reached the end"), never an error.
    async fn next_item(&mut self) -> Option<MediaItem>;

    /// Step back using the provider's own queue. The controller prefers
    /// the shared navigation history; this is only the fallback.
    async fn previous_item(&mut self) -> Option<MediaItem>;

    /// The item currently shown. Pure accessor.
    fn current_item(&self) -> Option<&MediaItem>;

    /// Current lifecycle state.
    fn state(&self) -> ProviderState;

    /// Whether `next_item()` could yield something. O(1), no I/O.
    fn can_advance(&self) -> bool;

    /// Whether `previous_item()` could yield something. O(1), no I/O.
    fn can_go_back(&self) -> bool;

    /// Suspend background work. Not a state transition.
    fn pause(&mut self);

    /// Resume background work, continuing any suspended scan.
    async fn resume(&mut self);

    /// Tear down, releasing or caching internal state.
    fn disconnect(&mut self);

    /// Re-attach after `disconnect()` or an error. The only legal path
    /// out of `Error`.
    async fn reconnect(&mut self) -> Result<(), ProviderError>;

    /// Diagnostics counters.
    fn counters(&self) -> DebugCounters;
}

/// Everything a provider might need from its environment.
#[derive(Clone)]
pub struct ProviderDeps {
    pub browser: Arc<dyn FolderBrowser>,
    pub catalog: Option<Arc<dyn CatalogIndex>>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub scan_cache: SharedScanCache,
}

/// Construct the provider selected by the configuration tag.
///
/// The configuration is assumed to have passed [`Config::validate`];
/// this only checks requirements that depend on the wired dependencies.
pub fn provider_for(
    config: &Config,
    deps: &ProviderDeps,
) -> Result<Box<dyn MediaProvider>, ProviderError> {
    match config.source.kind {
        SourceKind::Single => Ok(Box::new(simple::SingleMediaProvider::new(
            config.source.root.clone(),
        ))),
        SourceKind::Folder => Ok(Box::new(simple::SimpleFolderProvider::new(
            config.source.root.clone(),
            deps.browser.clone(),
        ))),
        SourceKind::Subfolder => Ok(Box::new(subfolder::SubfolderProvider::new(
            config.source.root.clone(),
            config.subfolder.clone(),
            deps.browser.clone(),
            deps.scan_cache.clone(),
        ))),
        SourceKind::Indexed => {
            let catalog = deps.catalog.clone().ok_or_else(|| {
                ProviderError::configuration("indexed source requires a catalog index")
            })?;
            Ok(Box::new(indexed::IndexedCatalogProvider::new(
                config.indexed.clone(),
                catalog,
                deps.geocoder.clone(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_token() {
        let token = PauseToken::new();
        assert!(!token.is_paused());

        let shared = token.clone();
        shared.pause();
        assert!(token.is_paused());

        token.resume();
        assert!(!shared.is_paused());
    }

    #[test]
    fn test_provider_for_indexed_requires_catalog() {
        let mut config = Config::default();
        config.source.kind = SourceKind::Indexed;
        let deps = ProviderDeps {
            browser: Arc::new(crate::source::fs::FsBrowser::new()),
            catalog: None,
            geocoder: None,
            scan_cache: crate::cache::shared(4),
        };
        let result = provider_for(&config, &deps);
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }
}
