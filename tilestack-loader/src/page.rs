//! The per-page context that wires stacks, proximity and scroll speed together.
//!
//! One [`PageContext`] exists per page. The host drives it from four places:
//!
//! - [`PageContext::ready`] once the document is ready,
//! - [`PageContext::request_layout`] from resize notifications,
//! - [`PageContext::frame`] once per display frame,
//! - [`PageContext::on_proximity`] whenever the proximity mechanism delivers
//!   a batch of entries.
//!
//! Decode futures are spawned on the caller's [`LocalSpawn`]; they complete
//! against the shared tracker, so every callback runs on the page's thread.

use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
    time::Duration,
};

use futures::task::{LocalSpawn, LocalSpawnExt};
use smallvec::SmallVec;
use tilestack_ui::{
    config::StackDataset,
    px::Px,
    stack::{LayoutReport, LayoutScheduler, StackId, StackRegistry, StackSurface},
};
use tracing::{debug, info, warn};

use crate::{
    Instant,
    gate::{DEFAULT_RESUME_MARGIN, DEFAULT_SETTLE_DELAY, LoadGateController, ResumeReport},
    proximity::{ProximityEntry, ProximityRegion, ViewportGeometry, ViewportProximitySource},
    velocity::{DEFAULT_VELOCITY_THRESHOLD, ScrollVelocityMonitor, SpeedTransition},
    visibility::{ImageHost, ImageId, LoadState, VisibilityTracker},
};

/// Tunables of the deferred loader.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Scroll speed above which loading pauses, in pixels per second.
    pub velocity_threshold: f64,
    /// How long the scroll must stay slow before loading resumes.
    pub settle_delay: Duration,
    /// Trigger region registered for every watched image.
    pub proximity: ProximityRegion,
    /// Window around the viewport checked directly on resume.
    pub resume_margin: Px,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
            settle_delay: DEFAULT_SETTLE_DELAY,
            proximity: ProximityRegion::default(),
            resume_margin: DEFAULT_RESUME_MARGIN,
        }
    }
}

/// Everything the page exposes to the context in one frame.
pub trait PageSurface: StackSurface + ViewportGeometry {}

impl<T: StackSurface + ViewportGeometry> PageSurface for T {}

/// What one call to [`PageContext::frame`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// The layout pass, if one was pending.
    pub layout: Option<LayoutReport>,
    /// The speed transition observed this frame.
    pub transition: Option<SpeedTransition>,
    /// The resume that ran this frame.
    pub resumed: Option<ResumeReport>,
}

/// Per-page state: stack layout plus velocity-gated deferred loading.
pub struct PageContext<S, H, Sp>
where
    S: ViewportProximitySource + 'static,
    H: ImageHost + 'static,
    Sp: LocalSpawn,
{
    config: LoaderConfig,
    stacks: StackRegistry,
    layout: LayoutScheduler,
    tracker: Rc<RefCell<VisibilityTracker<S>>>,
    host: Rc<H>,
    spawner: Sp,
    monitor: Option<ScrollVelocityMonitor>,
    gate: LoadGateController,
}

impl<S, H, Sp> PageContext<S, H, Sp>
where
    S: ViewportProximitySource + 'static,
    H: ImageHost + 'static,
    Sp: LocalSpawn,
{
    /// Creates the context. Nothing is watched until [`ready`](Self::ready).
    pub fn new(config: LoaderConfig, source: S, host: H, spawner: Sp) -> Self {
        let tracker = VisibilityTracker::new(source, config.proximity);
        let gate = LoadGateController::new(config.settle_delay, config.resume_margin);
        Self {
            config,
            stacks: StackRegistry::new(),
            layout: LayoutScheduler::new(),
            tracker: Rc::new(RefCell::new(tracker)),
            host: Rc::new(host),
            spawner,
            monitor: None,
            gate,
        }
    }

    /// The loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Registers a stack from its markup. Invalid stacks are logged and skipped.
    pub fn add_stack(&mut self, dataset: &StackDataset) -> Option<StackId> {
        match self.stacks.register(dataset) {
            Ok(id) => {
                self.layout.request();
                Some(id)
            }
            Err(err) => {
                warn!("Ignoring image stack: {err}");
                None
            }
        }
    }

    /// Stacks known to the page.
    pub fn stacks(&self) -> &StackRegistry {
        &self.stacks
    }

    /// Adds a lazy image. It is watched on [`ready`](Self::ready), or right
    /// away when the page is already running and loading is not paused.
    pub fn add_image(&mut self, pending_source: Option<String>) -> ImageId {
        let mut tracker = self.tracker.borrow_mut();
        let id = tracker.add_image(pending_source);
        if self.monitor.is_some() && !self.gate.is_paused() {
            tracker.watch(id);
        }
        id
    }

    /// The lifecycle state of a lazy image.
    pub fn image_state(&self, image: ImageId) -> Option<LoadState> {
        self.tracker.borrow().state(image)
    }

    /// Read access to the tracker.
    pub fn tracker(&self) -> Ref<'_, VisibilityTracker<S>> {
        self.tracker.borrow()
    }

    /// Write access to the tracker.
    pub fn tracker_mut(&mut self) -> RefMut<'_, VisibilityTracker<S>> {
        self.tracker.borrow_mut()
    }

    /// The load gate.
    pub fn gate(&self) -> &LoadGateController {
        &self.gate
    }

    /// The image host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Starts the page: samples the initial scroll position, watches every
    /// lazy image and schedules the first layout pass.
    pub fn ready<P: PageSurface>(&mut self, now: Instant, surface: &P) {
        if self.monitor.is_some() {
            debug!("Page already started");
            return;
        }
        self.monitor = Some(ScrollVelocityMonitor::new(
            scroll_position(surface),
            now,
            self.config.velocity_threshold,
        ));

        let mut tracker = self.tracker.borrow_mut();
        let images: SmallVec<[ImageId; 16]> = tracker.images().collect();
        let watched = images.into_iter().filter(|&image| tracker.watch(image)).count();
        self.layout.request();
        info!(
            "Page ready: {} stacks, {watched} deferred images",
            self.stacks.len()
        );
    }

    /// Marks layout stale; the pass runs on the next frame.
    pub fn request_layout(&mut self) {
        self.layout.request();
    }

    /// Per-frame work: pending layout, scroll sampling and the load gate.
    pub fn frame<P: PageSurface>(&mut self, now: Instant, surface: &mut P) -> FrameReport {
        let layout = self.layout.on_frame(&self.stacks, surface);
        let Some(monitor) = self.monitor.as_mut() else {
            return FrameReport {
                layout,
                ..FrameReport::default()
            };
        };

        let transition = monitor.sample(scroll_position(&*surface), now);
        let mut tracker = self.tracker.borrow_mut();
        if let Some(transition) = transition {
            self.gate.on_transition(transition, now, &mut *tracker);
        }
        let resumed = self.gate.poll(now, &mut *tracker, &*surface);

        FrameReport {
            layout,
            transition,
            resumed,
        }
    }

    /// Handles a batch of proximity entries, spawning one decode task per
    /// image that starts loading.
    pub fn on_proximity(&mut self, entries: &[ProximityEntry]) -> usize {
        let tasks = self
            .tracker
            .borrow_mut()
            .handle_entries(entries, &*self.host);
        let started = tasks.len();

        for task in tasks {
            let tracker = Rc::clone(&self.tracker);
            let host = Rc::clone(&self.host);
            let image = task.image;
            let completion = async move {
                let outcome = task.decode.await;
                tracker.borrow_mut().finish_decode(image, outcome, &*host);
            };
            if let Err(err) = self.spawner.spawn_local(completion) {
                warn!("Could not spawn decode task for image {image:?}: {err}");
            }
        }
        started
    }

    /// Releases every proximity registration and cancels a pending resume.
    pub fn teardown(&mut self) {
        self.monitor = None;
        self.gate = LoadGateController::new(self.config.settle_delay, self.config.resume_margin);
        match self.tracker.try_borrow_mut() {
            Ok(mut tracker) => tracker.release_all(),
            Err(_) => warn!("Tracker busy during teardown; registrations not released"),
        }
    }
}

impl<S, H, Sp> Drop for PageContext<S, H, Sp>
where
    S: ViewportProximitySource + 'static,
    H: ImageHost + 'static,
    Sp: LocalSpawn,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

fn scroll_position(geometry: &dyn ViewportGeometry) -> f64 {
    geometry.viewport().y.to_f64()
}

#[cfg(test)]
mod tests {
    use futures::executor::LocalPool;

    use super::*;
    use crate::test::{FakeHost, FakePage, FakeProximity};

    type Context = PageContext<FakeProximity, FakeHost, futures::executor::LocalSpawner>;

    fn context(pool: &LocalPool) -> Context {
        PageContext::new(
            LoaderConfig::default(),
            FakeProximity::default(),
            FakeHost::default(),
            pool.spawner(),
        )
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = LoaderConfig::default();
        assert_eq!(config.velocity_threshold, 900.0);
        assert_eq!(config.settle_delay, Duration::from_millis(180));
        assert_eq!(config.proximity.margin, Px(150));
        assert_eq!(config.resume_margin, Px(250));
    }

    #[test]
    fn invalid_stacks_are_skipped() {
        let pool = LocalPool::new();
        let mut page = context(&pool);
        let broken = StackDataset::new().with("data-tile-size", "0");
        assert!(page.add_stack(&broken).is_none());
        assert!(page.stacks().is_empty());
    }

    #[test]
    fn ready_watches_and_lays_out() {
        let pool = LocalPool::new();
        let mut page = context(&pool);
        let stack = page
            .add_stack(
                &StackDataset::new()
                    .with("data-tile-size", "100")
                    .with("data-natural-width", "1600")
                    .with("data-natural-height", "900")
                    .with("data-width", "50%"),
            )
            .expect("valid stack");
        let lazy = page.add_image(Some("a.png".to_string()));
        let eager = page.add_image(None);

        let mut surface = FakePage::new(1280.0, 800);
        let now = Instant::now();
        page.ready(now, &surface);
        assert_eq!(page.image_state(lazy), Some(LoadState::Watched));
        assert_eq!(page.image_state(eager), Some(LoadState::Unwatched));

        let report = page.frame(now, &mut surface);
        let layout = report.layout.expect("layout ran");
        assert_eq!(layout.applied.len(), 1);
        assert_eq!(layout.applied[0].0, stack);
        assert_eq!(surface.applied.len(), 1);
        assert!(page.frame(now, &mut surface).layout.is_none());
    }

    #[test]
    fn images_added_after_ready_are_watched() {
        let pool = LocalPool::new();
        let mut page = context(&pool);
        let surface = FakePage::new(1280.0, 800);
        page.ready(Instant::now(), &surface);

        let late = page.add_image(Some("late.png".to_string()));
        assert_eq!(page.image_state(late), Some(LoadState::Watched));
    }

    #[test]
    fn teardown_releases_registrations() {
        let pool = LocalPool::new();
        let mut page = context(&pool);
        page.add_image(Some("a.png".to_string()));
        page.add_image(Some("b.png".to_string()));
        page.ready(Instant::now(), &FakePage::new(1280.0, 800));
        assert_eq!(page.tracker().registered_count(), 2);

        page.teardown();
        assert_eq!(page.tracker().registered_count(), 0);
        assert!(page.tracker().source().registered_ids().is_empty());
    }
}
