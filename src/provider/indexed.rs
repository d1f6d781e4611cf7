//! Paged queue over an externally maintained catalog index.
//!
//! Unlike the scanner, this provider never walks folders itself; it
//! asks the index for batches of already-known items and pages through
//! them. The queue is append-only within a session, so stepping back is
//! just moving the cursor, and a refill can never disturb positions
//! already shown.
//!
//! Items retired through a side channel (favorited away, edited,
//! deleted) go into a session exclusion set; they are dropped from the
//! live queue immediately and refills cannot reintroduce them.
//!
//! Place-name enrichment runs lazily a few positions ahead of the
//! cursor: coordinates are reverse-geocoded on spawned tasks and the
//! results cross back over a channel, applied the next time navigation
//! touches the queue. A failed lookup is logged and the item simply
//! keeps showing coordinates.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{DebugCounters, MediaProvider, PauseToken, ProviderState};
use crate::config::{IndexedConfig, QueueMode};
use crate::error::ProviderError;
use crate::model::{MediaItem, MediaMetadata, MediaType};
use crate::source::{CatalogEntry, CatalogIndex, CatalogQuery, Geocoder, QueryOrder};

/// Outcome of one reverse-geocode lookup, keyed by item id.
struct EnrichResult {
    item_id: u64,
    place: Option<String>,
}

/// Provider paging through an opaque catalog index.
pub struct IndexedCatalogProvider {
    config: IndexedConfig,
    catalog: Arc<dyn CatalogIndex>,
    geocoder: Option<Arc<dyn Geocoder>>,
    state: ProviderState,

    /// Append-only within a session; the cursor indexes into it.
    queue: Vec<MediaItem>,
    cursor: usize,
    /// Locators retired this session. Survives disconnect/reconnect.
    excluded: HashSet<String>,

    /// Folder rotation for [`QueueMode::FolderSequential`].
    folders: Vec<String>,
    folder_cursor: usize,

    /// Set once a fetch comes back with nothing new; cleared when the
    /// folder rotation advances or the provider reconnects. Keeps the
    /// low-threshold refill from hammering an exhausted index.
    index_drained: bool,
    total_matches: u64,

    enrich_tx: mpsc::UnboundedSender<EnrichResult>,
    enrich_rx: mpsc::UnboundedReceiver<EnrichResult>,
    /// Item ids already sent for lookup. A failed lookup is not retried
    /// within a session.
    attempted: HashSet<u64>,
    enriched: usize,
    pause: PauseToken,
}

impl IndexedCatalogProvider {
    pub fn new(
        config: IndexedConfig,
        catalog: Arc<dyn CatalogIndex>,
        geocoder: Option<Arc<dyn Geocoder>>,
    ) -> Self {
        let (enrich_tx, enrich_rx) = mpsc::unbounded_channel();
        Self {
            config,
            catalog,
            geocoder,
            state: ProviderState::Uninitialized,
            queue: Vec::new(),
            cursor: 0,
            excluded: HashSet::new(),
            folders: Vec::new(),
            folder_cursor: 0,
            index_drained: false,
            total_matches: 0,
            enrich_tx,
            enrich_rx,
            attempted: HashSet::new(),
            enriched: 0,
            pause: PauseToken::new(),
        }
    }

    fn item_from_entry(entry: &CatalogEntry) -> MediaItem {
        let media_type = MediaType::from_filename(&entry.filename).unwrap_or(MediaType::Image);
        let source_folder = entry
            .path
            .rsplit_once('/')
            .map(|(folder, _)| folder.to_string())
            .unwrap_or_default();
        let mut item = MediaItem::new(
            entry.path.clone(),
            entry.filename.clone(),
            media_type,
            source_folder,
        );
        item.metadata = Some(MediaMetadata {
            taken: entry.taken,
            coordinates: entry.coordinates,
            place: entry.place.clone(),
            rating: entry.rating,
            favorite: entry.favorite,
            enriching: false,
        });
        item
    }

    fn query(&self) -> CatalogQuery {
        let (folder, order) = match self.config.mode {
            QueueMode::Random => (self.config.folder.clone(), QueryOrder::Random),
            QueueMode::Sequential => (self.config.folder.clone(), QueryOrder::TakenDate),
            QueueMode::FolderSequential => (
                self.folders.get(self.folder_cursor).cloned(),
                QueryOrder::TakenDate,
            ),
        };
        CatalogQuery {
            count: self.config.batch_size,
            folder,
            file_type: self.config.file_type,
            order,
        }
    }

    /// Fetch one batch and append whatever is new. Returns the number
    /// of items added.
    async fn fetch_batch(&mut self) -> Result<usize, ProviderError> {
        let page = self.catalog.query(&self.query()).await?;
        self.total_matches = page.total_matches;

        let known: HashSet<&str> = self.queue.iter().map(|i| i.path.as_str()).collect();
        let fresh: Vec<MediaItem> = page
            .items
            .iter()
            .filter(|e| !known.contains(e.path.as_str()) && !self.excluded.contains(&e.path))
            .map(Self::item_from_entry)
            .collect();
        let added = fresh.len();
        self.queue.extend(fresh);

        if added == 0 {
            self.index_drained = true;
        }
        Ok(added)
    }

    /// Top the queue up. In folder rotation, an exhausted folder hands
    /// over to the next one, wrapping at the last; one full cycle
    /// without new items means the whole index is drained.
    async fn refill(&mut self) -> Result<usize, ProviderError> {
        if self.config.mode != QueueMode::FolderSequential {
            return self.fetch_batch().await;
        }
        let rounds = self.folders.len().max(1);
        for _ in 0..rounds {
            let added = self.fetch_batch().await?;
            if added > 0 {
                self.index_drained = false;
                return Ok(added);
            }
            self.folder_cursor = (self.folder_cursor + 1) % rounds;
        }
        Ok(0)
    }

    /// Refill triggered from navigation: failures are logged, never
    /// escalated out of `Ready`.
    async fn refill_opportunistic(&mut self) {
        if self.index_drained {
            return;
        }
        match self.refill().await {
            Ok(added) => {
                if added > 0 {
                    tracing::debug!("catalog refill added {added} items");
                }
            }
            Err(e) => tracing::warn!("catalog refill failed: {e}"),
        }
    }

    fn remaining_ahead(&self) -> usize {
        self.queue.len().saturating_sub(self.cursor + 1)
    }

    /// Kick off geocode lookups for the items just ahead of the cursor.
    fn schedule_enrichment(&mut self) {
        if self.pause.is_paused() {
            return;
        }
        let Some(geocoder) = &self.geocoder else {
            return;
        };
        for offset in 0..=self.config.lookahead {
            let Some(item) = self.queue.get_mut(self.cursor + offset) else {
                break;
            };
            if !item.wants_place() || self.attempted.contains(&item.id) {
                continue;
            }
            let Some(meta) = item.metadata.as_mut() else {
                continue;
            };
            let Some((lat, lon)) = meta.coordinates else {
                continue;
            };
            meta.enriching = true;
            self.attempted.insert(item.id);

            let geocoder = geocoder.clone();
            let tx = self.enrich_tx.clone();
            let item_id = item.id;
            let path = item.path.clone();
            tokio::spawn(async move {
                let place = match geocoder.geocode(lat, lon).await {
                    Ok(place) => Some(place.label()),
                    Err(e) => {
                        tracing::warn!("geocode of {path} failed: {e}");
                        None
                    }
                };
                // Receiver dropped means the provider is gone.
                let _ = tx.send(EnrichResult { item_id, place });
            });
        }
    }

    /// Apply any enrichment results that have come back since the last
    /// time navigation touched the queue.
    fn apply_enrichment(&mut self) {
        while let Ok(result) = self.enrich_rx.try_recv() {
            let Some(item) = self.queue.iter_mut().find(|i| i.id == result.item_id) else {
                continue;
            };
            let Some(meta) = item.metadata.as_mut() else {
                continue;
            };
            meta.enriching = false;
            if let Some(place) = result.place {
                meta.place = Some(place);
                self.enriched += 1;
            }
        }
    }

    /// Retire an item for the rest of the session (favorited away,
    /// edited, deleted). Removes it from the live queue, keeping the
    /// cursor on the item it pointed at, and bars it from refills.
    pub fn exclude(&mut self, path: &str) {
        self.excluded.insert(path.to_string());
        let Some(position) = self.queue.iter().position(|i| i.path == path) else {
            return;
        };
        self.queue.remove(position);
        if position < self.cursor {
            self.cursor -= 1;
        } else if self.cursor >= self.queue.len() {
            self.cursor = self.queue.len().saturating_sub(1);
        }
    }

    async fn connect(&mut self) -> Result<(), ProviderError> {
        self.state = ProviderState::Loading;
        self.queue.clear();
        self.cursor = 0;
        self.index_drained = false;
        self.folder_cursor = 0;
        self.attempted.clear();

        if self.config.mode == QueueMode::FolderSequential {
            let folders = match self.catalog.folders().await {
                Ok(folders) => folders,
                Err(e) => {
                    self.state = ProviderState::Error;
                    return Err(e.into());
                }
            };
            if folders.is_empty() {
                self.state = ProviderState::Error;
                return Err(ProviderError::empty("catalog index lists no folders"));
            }
            self.folders = folders;
        }

        if let Err(e) = self.refill().await {
            self.state = ProviderState::Error;
            return Err(e);
        }
        if self.queue.is_empty() {
            self.state = ProviderState::Error;
            return Err(ProviderError::empty("catalog query matched nothing"));
        }

        self.state = ProviderState::Ready;
        self.schedule_enrichment();
        tracing::info!(
            "indexed provider ready: {} queued of {} matching",
            self.queue.len(),
            self.total_matches
        );
        Ok(())
    }
}

#[async_trait]
impl MediaProvider for IndexedCatalogProvider {
    async fn initialize(&mut self) -> Result<(), ProviderError> {
        self.connect().await
    }

    async fn next_item(&mut self) -> Option<MediaItem> {
        if self.state != ProviderState::Ready {
            return None;
        }
        self.apply_enrichment();

        if self.remaining_ahead() == 0 {
            self.refill_opportunistic().await;
        }
        if self.remaining_ahead() == 0 {
            // Reached the end of what the index has.
            return None;
        }
        self.cursor += 1;

        if self.remaining_ahead() <= self.config.low_threshold {
            self.refill_opportunistic().await;
        }
        self.schedule_enrichment();
        self.queue.get(self.cursor).cloned()
    }

    async fn previous_item(&mut self) -> Option<MediaItem> {
        if self.state != ProviderState::Ready || self.cursor == 0 {
            return None;
        }
        self.apply_enrichment();
        // Everything at or below the cursor has been shown, so this
        // never surfaces an unseen item.
        self.cursor -= 1;
        self.queue.get(self.cursor).cloned()
    }

    fn current_item(&self) -> Option<&MediaItem> {
        if self.state != ProviderState::Ready {
            return None;
        }
        self.queue.get(self.cursor)
    }

    fn state(&self) -> ProviderState {
        self.state
    }

    fn can_advance(&self) -> bool {
        self.remaining_ahead() > 0 || !self.index_drained
    }

    fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    fn pause(&mut self) {
        self.pause.pause();
    }

    async fn resume(&mut self) {
        self.pause.resume();
        self.apply_enrichment();
        self.schedule_enrichment();
    }

    fn disconnect(&mut self) {
        self.queue.clear();
        self.cursor = 0;
        self.folders.clear();
        self.folder_cursor = 0;
        self.index_drained = false;
        self.state = ProviderState::Uninitialized;
    }

    async fn reconnect(&mut self) -> Result<(), ProviderError> {
        self.connect().await
    }

    fn counters(&self) -> DebugCounters {
        DebugCounters {
            queue_len: self.remaining_ahead(),
            history_len: 0,
            discovered_folders: self.folders.len(),
            excluded: self.excluded.len(),
            enriched: self.enriched,
        }
    }
}
