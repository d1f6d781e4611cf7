//! Slideshow playback: one provider, one history, one timer.
//!
//! Auto-advance uses a single-shot sleep task that is re-armed after
//! each successful advance rather than a periodic interval; a slow
//! provider fetch therefore delays the next tick instead of letting
//! ticks pile up. Every armed timer carries a generation number and a
//! tick is acted on only if its generation is still current, so a
//! timer that was aborted just after firing cannot cause a double
//! advance.
//!
//! Manual navigation consults the shared [`NavigationHistory`] first;
//! the provider is only asked for fresh items once the history has no
//! forward entries left.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{AdvancePolicy, PlaybackConfig};
use crate::error::ProviderError;
use crate::history::NavigationHistory;
use crate::model::MediaItem;
use crate::provider::{DebugCounters, MediaProvider, ProviderState};

/// Drives one provider on a fixed advance interval.
pub struct PlaybackController {
    provider: Box<dyn MediaProvider>,
    history: NavigationHistory,
    interval: Duration,
    policy: AdvancePolicy,
    paused: bool,

    /// The pending single-shot timer task, if any.
    timer: Option<JoinHandle<()>>,
    /// Bumped every time a timer is armed; stale ticks are dropped.
    generation: u64,
    tick_tx: mpsc::UnboundedSender<u64>,
    tick_rx: mpsc::UnboundedReceiver<u64>,
}

impl PlaybackController {
    pub fn new(provider: Box<dyn MediaProvider>, config: &PlaybackConfig) -> Self {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            history: NavigationHistory::new(config.history_capacity),
            interval: Duration::from_secs(config.interval_secs),
            policy: config.advance_policy,
            paused: false,
            timer: None,
            generation: 0,
            tick_tx,
            tick_rx,
        }
    }

    /// Initialize the provider, seed the history with the first item
    /// and arm the first timer.
    pub async fn start(&mut self) -> Result<(), ProviderError> {
        self.provider.initialize().await?;
        if let Some(current) = self.provider.current_item() {
            self.history.add(current.clone());
        }
        if !self.paused {
            self.arm_timer();
        }
        Ok(())
    }

    /// Swap in a freshly configured provider. The old one is fully
    /// disconnected first and the history starts over.
    pub async fn replace_provider(
        &mut self,
        provider: Box<dyn MediaProvider>,
    ) -> Result<(), ProviderError> {
        self.abort_timer();
        self.provider.disconnect();
        self.provider = provider;
        self.history.clear();
        self.start().await
    }

    /// The item currently on screen.
    pub fn current(&self) -> Option<MediaItem> {
        self.history
            .current()
            .cloned()
            .or_else(|| self.provider.current_item().cloned())
    }

    /// Wait for the next timer tick and advance on it. Returns the
    /// newly shown item, or `None` when the tick was stale or the
    /// provider is exhausted.
    pub async fn run_once(&mut self) -> Option<MediaItem> {
        let generation = self.tick_rx.recv().await?;
        self.on_tick(generation).await
    }

    /// Handle one timer tick. Stale generations are ignored.
    pub async fn on_tick(&mut self, generation: u64) -> Option<MediaItem> {
        if generation != self.generation || self.paused {
            return None;
        }
        let item = self.advance().await;
        if item.is_some() {
            self.arm_timer();
        } else {
            self.abort_timer();
            tracing::info!("provider exhausted, auto-advance stopped");
        }
        item
    }

    /// Manual step forward. Replays the history's forward entries
    /// before asking the provider for anything new.
    pub async fn next(&mut self) -> Option<MediaItem> {
        let item = if self.history.can_go_forward() {
            self.history.next()
        } else {
            self.advance().await
        };
        if item.is_some() {
            self.apply_manual_policy();
        }
        item
    }

    /// Manual step back, from the history when it has one, otherwise
    /// from the provider's own fallback.
    pub async fn previous(&mut self) -> Option<MediaItem> {
        let item = match self.history.previous() {
            Some(item) => Some(item),
            None => self.provider.previous_item().await,
        };
        if item.is_some() {
            self.apply_manual_policy();
        }
        item
    }

    /// Stop the timer and suspend the provider's background work.
    pub fn pause(&mut self) {
        self.paused = true;
        self.abort_timer();
        self.provider.pause();
    }

    /// Undo [`pause`](Self::pause). The timer is re-armed only once the
    /// provider reports itself ready.
    pub async fn resume(&mut self) {
        self.paused = false;
        self.provider.resume().await;
        if self.provider.state() == ProviderState::Ready {
            self.arm_timer();
        }
    }

    /// Host visibility change: a hidden widget behaves exactly like a
    /// paused one.
    pub async fn set_visible(&mut self, visible: bool) {
        if visible {
            self.resume().await;
        } else {
            self.pause();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn provider_state(&self) -> ProviderState {
        self.provider.state()
    }

    /// Provider counters with the history length filled in.
    pub fn counters(&self) -> DebugCounters {
        DebugCounters {
            history_len: self.history.len(),
            ..self.provider.counters()
        }
    }

    async fn advance(&mut self) -> Option<MediaItem> {
        let item = self.provider.next_item().await;
        if let Some(item) = &item {
            self.history.add(item.clone());
        }
        item
    }

    fn apply_manual_policy(&mut self) {
        match self.policy {
            AdvancePolicy::Reset => {
                if !self.paused {
                    self.arm_timer();
                }
            }
            AdvancePolicy::Pause => {
                self.paused = true;
                self.abort_timer();
            }
            AdvancePolicy::Continue => {}
        }
    }

    fn arm_timer(&mut self) {
        self.abort_timer();
        self.generation += 1;
        let generation = self.generation;
        let interval = self.interval;
        let tx = self.tick_tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            // Receiver dropped means the controller is gone.
            let _ = tx.send(generation);
        }));
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.abort_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use crate::model::MediaType;

    /// Provider stub handing out numbered items and logging lifecycle
    /// calls.
    struct StubProvider {
        counter: usize,
        limit: usize,
        state: ProviderState,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl StubProvider {
        fn new(limit: usize) -> (Self, Arc<Mutex<Vec<&'static str>>>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    counter: 0,
                    limit,
                    state: ProviderState::Uninitialized,
                    log: log.clone(),
                },
                log,
            )
        }

        fn item(n: usize) -> MediaItem {
            MediaItem::new(
                format!("/p/{n}.jpg"),
                format!("{n}.jpg"),
                MediaType::Image,
                "/p",
            )
        }
    }

    #[async_trait]
    impl MediaProvider for StubProvider {
        async fn initialize(&mut self) -> Result<(), ProviderError> {
            self.log.lock().unwrap().push("initialize");
            self.counter = 1;
            self.state = ProviderState::Ready;
            Ok(())
        }

        async fn next_item(&mut self) -> Option<MediaItem> {
            if self.counter >= self.limit {
                return None;
            }
            self.counter += 1;
            Some(Self::item(self.counter))
        }

        async fn previous_item(&mut self) -> Option<MediaItem> {
            None
        }

        fn current_item(&self) -> Option<&MediaItem> {
            None
        }

        fn state(&self) -> ProviderState {
            self.state
        }

        fn can_advance(&self) -> bool {
            self.counter < self.limit
        }

        fn can_go_back(&self) -> bool {
            false
        }

        fn pause(&mut self) {
            self.log.lock().unwrap().push("pause");
        }

        async fn resume(&mut self) {
            self.log.lock().unwrap().push("resume");
        }

        fn disconnect(&mut self) {
            self.log.lock().unwrap().push("disconnect");
            self.state = ProviderState::Uninitialized;
        }

        async fn reconnect(&mut self) -> Result<(), ProviderError> {
            self.initialize().await
        }

        fn counters(&self) -> DebugCounters {
            DebugCounters::default()
        }
    }

    fn config(policy: AdvancePolicy) -> PlaybackConfig {
        PlaybackConfig {
            interval_secs: 1,
            advance_policy: policy,
            history_capacity: 10,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_advance_rearms() {
        let (provider, _) = StubProvider::new(5);
        let mut controller =
            PlaybackController::new(Box::new(provider), &config(AdvancePolicy::Reset));
        controller.start().await.unwrap();

        // Paused virtual time fast-forwards through the sleeps.
        let first = controller.run_once().await.unwrap();
        assert_eq!(first.filename, "2.jpg");
        let second = controller.run_once().await.unwrap();
        assert_eq!(second.filename, "3.jpg");
        assert_eq!(controller.counters().history_len, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_tick_is_ignored() {
        let (provider, _) = StubProvider::new(5);
        let mut controller =
            PlaybackController::new(Box::new(provider), &config(AdvancePolicy::Reset));
        controller.start().await.unwrap();

        let stale = controller.generation;
        controller.arm_timer();
        assert!(controller.on_tick(stale).await.is_none());
        assert!(controller.on_tick(controller.generation).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_provider_stops_the_timer() {
        let (provider, _) = StubProvider::new(1);
        let mut controller =
            PlaybackController::new(Box::new(provider), &config(AdvancePolicy::Reset));
        controller.start().await.unwrap();

        assert!(controller.run_once().await.is_none());
        assert!(controller.timer.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_policy_rearms_on_manual_navigation() {
        let (provider, _) = StubProvider::new(5);
        let mut controller =
            PlaybackController::new(Box::new(provider), &config(AdvancePolicy::Reset));
        controller.start().await.unwrap();

        let before = controller.generation;
        controller.next().await.unwrap();
        assert!(controller.generation > before);
        assert!(!controller.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_policy_stops_auto_advance() {
        let (provider, _) = StubProvider::new(5);
        let mut controller =
            PlaybackController::new(Box::new(provider), &config(AdvancePolicy::Pause));
        controller.start().await.unwrap();

        controller.next().await.unwrap();
        assert!(controller.is_paused());
        assert!(controller.timer.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_policy_leaves_timer_alone() {
        let (provider, _) = StubProvider::new(5);
        let mut controller =
            PlaybackController::new(Box::new(provider), &config(AdvancePolicy::Continue));
        controller.start().await.unwrap();

        let before = controller.generation;
        controller.next().await.unwrap();
        assert_eq!(controller.generation, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_replays_history_before_provider() {
        let (provider, _) = StubProvider::new(5);
        let mut controller =
            PlaybackController::new(Box::new(provider), &config(AdvancePolicy::Continue));
        controller.start().await.unwrap();

        let a = controller.next().await.unwrap();
        let b = controller.next().await.unwrap();
        assert_ne!(a.path, b.path);

        assert_eq!(controller.previous().await.unwrap().path, a.path);
        // Forward again comes from the history, not a fresh fetch.
        assert_eq!(controller.next().await.unwrap().path, b.path);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_loss_pauses_and_resumes() {
        let (provider, log) = StubProvider::new(5);
        let mut controller =
            PlaybackController::new(Box::new(provider), &config(AdvancePolicy::Reset));
        controller.start().await.unwrap();

        controller.set_visible(false).await;
        assert!(controller.is_paused());
        assert!(controller.timer.is_none());

        controller.set_visible(true).await;
        assert!(!controller.is_paused());
        assert!(controller.timer.is_some());
        assert_eq!(*log.lock().unwrap(), vec!["initialize", "pause", "resume"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_provider_disconnects_old() {
        let (old, old_log) = StubProvider::new(5);
        let mut controller = PlaybackController::new(Box::new(old), &config(AdvancePolicy::Reset));
        controller.start().await.unwrap();
        controller.next().await.unwrap();

        let (new, _) = StubProvider::new(5);
        controller.replace_provider(Box::new(new)).await.unwrap();

        assert!(old_log.lock().unwrap().contains(&"disconnect"));
        // History starts over for the new source.
        assert_eq!(controller.counters().history_len, 0);
    }
}
