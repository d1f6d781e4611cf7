//! Hierarchical probabilistic scanner over an unbounded folder tree.
//!
//! The goal is a bounded, near-uniform (priority-weighted) sample of a
//! subtree whose total size is unknown and too large to enumerate into
//! memory. One depth-first pass visits every folder (subfolder order
//! randomized per level) and admits each file with an adaptive
//! acceptance probability chosen so the queue lands near its target
//! size regardless of how big the subtree turns out to be. This is a
//! streaming Bernoulli approximation of reservoir sampling; exactness
//! is unnecessary, only a visually even spread.
//!
//! The pass runs over an explicit folder stack so cooperative pause can
//! suspend it between folder fetches and resume exactly where it left
//! off. Scan state snapshots into the injected [`ScanCache`] keyed by
//! root path, so re-attaching to the same root resumes instantly.
//!
//! [`ScanCache`]: crate::cache::ScanCache

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{DebugCounters, MediaProvider, PauseToken, ProviderState};
use crate::cache::SharedScanCache;
use crate::config::SubfolderConfig;
use crate::error::ProviderError;
use crate::model::{MediaItem, MediaType};
use crate::source::{FolderBrowser, FolderEntry};

/// Estimate multiplier applied to the discovered count while the pass
/// is still running: plenty of unseen remainder is assumed.
///
/// Both multipliers are tuned values carried over from years of widget
/// use, not derived from a model.
pub const ESTIMATE_MULTIPLIER_SCANNING: f64 = 3.0;

/// Estimate multiplier once a full pass has completed and little
/// uncertainty about the remainder is left.
pub const ESTIMATE_MULTIPLIER_SETTLED: f64 = 1.2;

/// Acceptance-probability boost applied while refilling.
const REFILL_PROBABILITY_BOOST: f64 = 2.0;

/// A refill is scheduled once the shown count comes within this many
/// items of the target queue size.
const REFILL_HEADROOM: usize = 10;

/// Bounds for the batched-shuffle threshold.
const SHUFFLE_MIN: usize = 10;
const SHUFFLE_MAX: usize = 1000;

/// One folder discovered during a scan, retained so refills can
/// re-sample the tree without a fresh walk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderNode {
    pub path: String,
    pub depth: usize,
    pub file_count: usize,
    pub children: BTreeMap<String, FolderNode>,
}

impl FolderNode {
    /// Attach `node` under the node whose path is `parent`. Returns
    /// false if no such node exists.
    fn insert(&mut self, parent: &str, node: FolderNode) -> bool {
        if self.path == parent {
            self.children.insert(node.path.clone(), node);
            return true;
        }
        for child in self.children.values_mut() {
            if parent.starts_with(child.path.as_str()) && child.insert(parent, node.clone()) {
                return true;
            }
        }
        false
    }

    fn collect_paths(&self, out: &mut Vec<String>) {
        out.push(self.path.clone());
        for child in self.children.values() {
            child.collect_paths(out);
        }
    }

    fn count(&self) -> usize {
        1 + self.children.values().map(FolderNode::count).sum::<usize>()
    }
}

/// A folder waiting to be visited by the depth-first pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingFolder {
    pub path: String,
    pub parent: Option<String>,
    pub depth: usize,
}

/// Serialized scan state, stored in the reconnection cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSnapshot {
    pub queue: Vec<MediaItem>,
    pub shown: HashSet<String>,
    pub current: Option<MediaItem>,
    pub tree: Option<FolderNode>,
    pub pending: Vec<PendingFolder>,
    pub discovered_files: u64,
    pub pass_complete: bool,
}

enum ScanOutcome {
    Completed,
    Suspended,
}

/// Weighted-random sampling provider over a folder subtree.
pub struct SubfolderProvider {
    root: String,
    config: SubfolderConfig,
    browser: Arc<dyn FolderBrowser>,
    cache: SharedScanCache,
    state: ProviderState,

    queue: VecDeque<MediaItem>,
    /// Locators currently in the queue. Mirror of `queue`.
    queued: HashSet<String>,
    /// Locators already shown this exclusion epoch.
    shown: HashSet<String>,
    current: Option<MediaItem>,

    tree: Option<FolderNode>,
    pending: Vec<PendingFolder>,
    discovered_files: u64,
    pass_complete: bool,

    shuffle_counter: usize,
    refill_scheduled: bool,
    pause: PauseToken,
    rng: StdRng,
}

impl SubfolderProvider {
    pub fn new(
        root: String,
        config: SubfolderConfig,
        browser: Arc<dyn FolderBrowser>,
        cache: SharedScanCache,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            root,
            config,
            browser,
            cache,
            state: ProviderState::Uninitialized,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            shown: HashSet::new(),
            current: None,
            tree: None,
            pending: Vec::new(),
            discovered_files: 0,
            pass_complete: false,
            shuffle_counter: 0,
            refill_scheduled: false,
            pause: PauseToken::new(),
            rng,
        }
    }

    /// Clone of the cooperative pause flag, for whoever drives this
    /// provider from another task.
    pub fn pause_token(&self) -> PauseToken {
        self.pause.clone()
    }

    /// Acceptance probability before folder weighting.
    ///
    /// With a configured total this is simply `target / total`. Without
    /// one, the total is estimated from what has been discovered so
    /// far, inflated while the pass is still running to account for the
    /// unseen remainder.
    fn base_probability(&self) -> f64 {
        let target = self.config.target_queue_size as f64;
        let estimate = match self.config.total_estimate {
            Some(n) => n as f64,
            None => {
                let discovered = self.discovered_files as f64;
                let multiplier = if self.pass_complete {
                    ESTIMATE_MULTIPLIER_SETTLED
                } else {
                    ESTIMATE_MULTIPLIER_SCANNING
                };
                discovered.max((discovered * multiplier).round())
            }
        };
        if estimate <= 0.0 {
            1.0
        } else {
            (target / estimate).min(1.0)
        }
    }

    /// Largest matching priority-folder weight, default 1.0.
    fn weight_for(&self, folder: &str) -> f64 {
        self.config
            .priority_folders
            .iter()
            .filter(|p| folder.contains(p.pattern.as_str()))
            .map(|p| p.weight)
            .fold(1.0, f64::max)
    }

    fn shuffle_threshold(&self) -> usize {
        ((self.queue.len() as f64 * 0.10).round() as usize).clamp(SHUFFLE_MIN, SHUFFLE_MAX)
    }

    fn shuffle_queue(&mut self) {
        self.queue.make_contiguous().shuffle(&mut self.rng);
    }

    /// Admit one file into the queue, shuffling in batches so mixing
    /// cost stays bounded.
    fn accept(&mut self, entry: &FolderEntry, folder: &str, media_type: MediaType) {
        let item = MediaItem::new(
            entry.locator.clone(),
            entry.display_name.clone(),
            media_type,
            folder.to_string(),
        );
        self.queued.insert(item.path.clone());
        self.queue.push_back(item);

        self.shuffle_counter += 1;
        if self.shuffle_counter >= self.shuffle_threshold() {
            self.shuffle_queue();
            self.shuffle_counter = 0;
        }
    }

    /// Sample the files of one folder listing into the queue.
    fn sample_folder(&mut self, folder: &str, children: &[FolderEntry], boost: f64) {
        let weight = self.weight_for(folder);
        for entry in children {
            let Some(media_type) = entry.media_class else {
                continue;
            };
            if entry.is_folder
                || self.queued.contains(&entry.locator)
                || self.shown.contains(&entry.locator)
            {
                continue;
            }
            let probability = (self.base_probability() * weight * boost).min(1.0);
            if self.rng.random_bool(probability) {
                self.accept(entry, folder, media_type);
            }
        }
    }

    /// Drive the depth-first pass until it completes or the pause flag
    /// suspends it. A failed folder browse contributes zero items and
    /// never aborts the pass.
    async fn drive_scan(&mut self) -> ScanOutcome {
        while let Some(folder) = self.pending.pop() {
            if self.pause.is_paused() {
                self.pending.push(folder);
                return ScanOutcome::Suspended;
            }

            let listing = match self.browser.browse(&folder.path).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::warn!("skipping folder {}: {e}", folder.path);
                    continue;
                }
            };

            let file_count = listing
                .children
                .iter()
                .filter(|c| !c.is_folder && c.media_class.is_some())
                .count();
            self.record_folder(&folder, file_count);
            self.discovered_files += file_count as u64;

            self.sample_folder(&folder.path, &listing.children, 1.0);

            let child_depth = folder.depth + 1;
            if self.config.max_depth == 0 || child_depth <= self.config.max_depth {
                let mut subfolders: Vec<PendingFolder> = listing
                    .children
                    .iter()
                    .filter(|c| c.is_folder)
                    .map(|c| PendingFolder {
                        path: c.locator.clone(),
                        parent: Some(folder.path.clone()),
                        depth: child_depth,
                    })
                    .collect();
                subfolders.shuffle(&mut self.rng);
                self.pending.extend(subfolders);
            }
        }

        self.finish_pass();
        ScanOutcome::Completed
    }

    fn record_folder(&mut self, folder: &PendingFolder, file_count: usize) {
        let node = FolderNode {
            path: folder.path.clone(),
            depth: folder.depth,
            file_count,
            children: BTreeMap::new(),
        };
        match (&mut self.tree, &folder.parent) {
            (tree @ None, _) => *tree = Some(node),
            (Some(tree), Some(parent)) => {
                if !tree.insert(parent, node) {
                    tracing::warn!("no tree node for parent {parent}");
                }
            }
            (Some(_), None) => {}
        }
    }

    fn finish_pass(&mut self) {
        self.pass_complete = true;
        self.shuffle_queue();
        self.shuffle_counter = 0;
        tracing::info!(
            "scan pass over {} complete: {} folders, {} files discovered, queue {}",
            self.root,
            self.tree.as_ref().map(FolderNode::count).unwrap_or(0),
            self.discovered_files,
            self.queue.len()
        );
        self.store_snapshot();
    }

    /// Re-sample previously discovered folders to top the queue up.
    ///
    /// The shown-exclusion set is cleared (the slideshow may cycle),
    /// the acceptance probability is doubled, and only known folders
    /// are re-browsed; no new discovery happens.
    async fn run_refill(&mut self) {
        self.refill_scheduled = false;
        let Some(tree) = &self.tree else {
            return;
        };
        let mut folders = Vec::new();
        tree.collect_paths(&mut folders);

        self.shown.clear();
        // Keep the on-screen item excluded so it cannot be re-queued.
        if let Some(current) = &self.current {
            self.shown.insert(current.path.clone());
        }

        let before = self.queue.len();
        for folder in folders {
            if self.pause.is_paused() {
                // Try again after resume.
                self.refill_scheduled = true;
                return;
            }
            let listing = match self.browser.browse(&folder).await {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::warn!("refill skipping folder {folder}: {e}");
                    continue;
                }
            };
            self.sample_folder(&folder, &listing.children, REFILL_PROBABILITY_BOOST);
        }

        let added = self.queue.len() - before;
        if added == 0 {
            tracing::debug!("refill of {} found nothing new", self.root);
        } else {
            tracing::info!("refill of {} added {added} items", self.root);
            self.store_snapshot();
        }
    }

    fn maybe_schedule_refill(&mut self) {
        if self.refill_scheduled || !self.pass_complete {
            return;
        }
        let threshold = self.config.target_queue_size.saturating_sub(REFILL_HEADROOM);
        if self.shown.len() >= threshold {
            tracing::debug!(
                "scheduling refill for {} ({} shown)",
                self.root,
                self.shown.len()
            );
            self.refill_scheduled = true;
        }
    }

    /// Move the head of the queue into the current slot.
    fn advance_from_queue(&mut self) -> Option<MediaItem> {
        let item = self.queue.pop_front()?;
        self.queued.remove(&item.path);
        self.shown.insert(item.path.clone());
        self.current = Some(item.clone());
        self.maybe_schedule_refill();
        Some(item)
    }

    fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            queue: self.queue.iter().cloned().collect(),
            shown: self.shown.clone(),
            current: self.current.clone(),
            tree: self.tree.clone(),
            pending: self.pending.clone(),
            discovered_files: self.discovered_files,
            pass_complete: self.pass_complete,
        }
    }

    fn store_snapshot(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.store(&self.root, self.snapshot());
        }
    }

    /// Adopt a cached snapshot. Returns false when the snapshot holds
    /// nothing worth resuming.
    fn restore(&mut self, snapshot: ScanSnapshot) -> bool {
        if snapshot.queue.is_empty() && snapshot.current.is_none() && snapshot.pending.is_empty() {
            return false;
        }
        self.queued = snapshot.queue.iter().map(|i| i.path.clone()).collect();
        self.queue = snapshot.queue.into();
        self.shown = snapshot.shown;
        self.current = snapshot.current;
        self.tree = snapshot.tree;
        self.pending = snapshot.pending;
        self.discovered_files = snapshot.discovered_files;
        self.pass_complete = snapshot.pass_complete;

        if self.current.is_none() {
            self.advance_from_queue();
        }
        self.current.is_some()
    }

    fn reset_scan_state(&mut self) {
        self.queue.clear();
        self.queued.clear();
        self.shown.clear();
        self.current = None;
        self.tree = None;
        self.pending.clear();
        self.discovered_files = 0;
        self.pass_complete = false;
        self.shuffle_counter = 0;
        self.refill_scheduled = false;
    }

    async fn connect(&mut self) -> Result<(), ProviderError> {
        self.state = ProviderState::Loading;
        if self.root.is_empty() {
            self.state = ProviderState::Error;
            return Err(ProviderError::configuration(
                "subfolder source needs a root path",
            ));
        }

        // Re-attaching to a recently scanned root resumes instantly.
        let cached = self
            .cache
            .lock()
            .ok()
            .and_then(|mut cache| cache.get(&self.root));
        if let Some(snapshot) = cached
            && self.restore(snapshot)
        {
            tracing::info!("resumed {} from cached scan state", self.root);
            self.state = ProviderState::Ready;
            return Ok(());
        }

        self.reset_scan_state();
        self.pending.push(PendingFolder {
            path: self.root.clone(),
            parent: None,
            depth: 0,
        });

        match self.drive_scan().await {
            ScanOutcome::Completed => {
                if self.advance_from_queue().is_none() {
                    self.state = ProviderState::Error;
                    return Err(ProviderError::empty(format!(
                        "scan of {} found no media",
                        self.root
                    )));
                }
                self.state = ProviderState::Ready;
                Ok(())
            }
            ScanOutcome::Suspended => {
                // Keep whatever the partial pass produced; the scan
                // continues on resume.
                if self.advance_from_queue().is_some() {
                    self.state = ProviderState::Ready;
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl MediaProvider for SubfolderProvider {
    async fn initialize(&mut self) -> Result<(), ProviderError> {
        self.connect().await
    }

    async fn next_item(&mut self) -> Option<MediaItem> {
        if self.state != ProviderState::Ready {
            return None;
        }
        if self.refill_scheduled && !self.pause.is_paused() {
            self.run_refill().await;
        }
        self.advance_from_queue()
    }

    async fn previous_item(&mut self) -> Option<MediaItem> {
        // Sampled items are consumed on show; stepping back is the
        // navigation history's job.
        None
    }

    fn current_item(&self) -> Option<&MediaItem> {
        self.current.as_ref()
    }

    fn state(&self) -> ProviderState {
        self.state
    }

    fn can_advance(&self) -> bool {
        !self.queue.is_empty()
    }

    fn can_go_back(&self) -> bool {
        false
    }

    fn pause(&mut self) {
        self.pause.pause();
    }

    async fn resume(&mut self) {
        self.pause.resume();
        if !self.pass_complete && !self.pending.is_empty() {
            if let ScanOutcome::Completed = self.drive_scan().await
                && self.state == ProviderState::Loading
            {
                if self.advance_from_queue().is_some() {
                    self.state = ProviderState::Ready;
                } else {
                    self.state = ProviderState::Error;
                }
            }
        } else if self.refill_scheduled {
            self.run_refill().await;
        }
    }

    fn disconnect(&mut self) {
        if self.tree.is_some() {
            self.store_snapshot();
        }
        self.reset_scan_state();
        self.state = ProviderState::Uninitialized;
    }

    async fn reconnect(&mut self) -> Result<(), ProviderError> {
        self.connect().await
    }

    fn counters(&self) -> DebugCounters {
        DebugCounters {
            queue_len: self.queue.len(),
            history_len: 0,
            discovered_folders: self.tree.as_ref().map(FolderNode::count).unwrap_or(0),
            excluded: self.shown.len(),
            enriched: 0,
        }
    }
}
