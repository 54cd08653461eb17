//! Pauses deferred loading while the page scrolls fast.
//!
//! ## Usage
//!
//! Feed every [`SpeedTransition`] into [`LoadGateController::on_transition`]
//! and call [`LoadGateController::poll`] once per frame. Pausing is
//! synchronous; resuming waits for the scroll to stay slow for the settle
//! delay, and a new fast burst during that wait cancels the pending resume.

use std::time::Duration;

use smallvec::SmallVec;
use tilestack_ui::px::Px;
use tracing::{debug, trace};

use crate::{
    Instant,
    proximity::{ViewportGeometry, ViewportProximitySource, is_near_viewport},
    velocity::SpeedTransition,
    visibility::{ImageId, VisibilityTracker},
};

/// How long the scroll must stay slow before loading resumes.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(180);

/// Extra distance around the viewport checked directly on resume.
pub const DEFAULT_RESUME_MARGIN: Px = Px(250);

/// Where the gate is in its pause/resume cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatePhase {
    /// Loading runs normally.
    #[default]
    Idle,
    /// Fast scroll in progress; nothing is watched.
    Paused,
    /// Scroll slowed down; loading resumes at `deadline` unless it speeds up again.
    Settling {
        /// When the resume runs.
        deadline: Instant,
    },
}

/// What a resume did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResumeReport {
    /// Images found near the viewport by direct geometry and watched first.
    pub near: usize,
    /// All images watched by the resume, near ones included.
    pub watched: usize,
}

/// Debounced pause/resume controller around a [`VisibilityTracker`].
#[derive(Debug, Clone)]
pub struct LoadGateController {
    phase: GatePhase,
    settle_delay: Duration,
    resume_margin: Px,
}

impl Default for LoadGateController {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY, DEFAULT_RESUME_MARGIN)
    }
}

impl LoadGateController {
    /// Creates an idle gate.
    pub fn new(settle_delay: Duration, resume_margin: Px) -> Self {
        Self {
            phase: GatePhase::Idle,
            settle_delay,
            resume_margin,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    /// True while paused or waiting to resume.
    pub fn is_paused(&self) -> bool {
        !matches!(self.phase, GatePhase::Idle)
    }

    /// Reacts to a speed transition.
    pub fn on_transition<S: ViewportProximitySource>(
        &mut self,
        transition: SpeedTransition,
        now: Instant,
        tracker: &mut VisibilityTracker<S>,
    ) {
        match transition {
            SpeedTransition::BecameFast => {
                self.pause(tracker);
            }
            SpeedTransition::BecameSlow => {
                if self.phase == GatePhase::Paused {
                    let deadline = now + self.settle_delay;
                    debug!("Scroll settled; resuming in {:?}", self.settle_delay);
                    self.phase = GatePhase::Settling { deadline };
                }
            }
        }
    }

    /// Unwatches everything and enters the paused phase.
    ///
    /// Returns false when already paused. A pending resume is cancelled.
    pub fn pause<S: ViewportProximitySource>(&mut self, tracker: &mut VisibilityTracker<S>) -> bool {
        match self.phase {
            GatePhase::Paused => false,
            GatePhase::Settling { .. } => {
                debug!("Fast scroll while settling; resume cancelled");
                self.phase = GatePhase::Paused;
                tracker.unwatch_all();
                true
            }
            GatePhase::Idle => {
                debug!("Fast scroll; pausing deferred loading");
                self.phase = GatePhase::Paused;
                tracker.unwatch_all();
                true
            }
        }
    }

    /// Resumes immediately, skipping any remaining settle delay.
    ///
    /// Returns `None` when the gate was not paused.
    pub fn resume<S: ViewportProximitySource>(
        &mut self,
        tracker: &mut VisibilityTracker<S>,
        geometry: &dyn ViewportGeometry,
    ) -> Option<ResumeReport> {
        if self.phase == GatePhase::Idle {
            return None;
        }
        self.phase = GatePhase::Idle;
        Some(self.rewatch(tracker, geometry))
    }

    /// Runs the pending resume once its deadline has passed.
    pub fn poll<S: ViewportProximitySource>(
        &mut self,
        now: Instant,
        tracker: &mut VisibilityTracker<S>,
        geometry: &dyn ViewportGeometry,
    ) -> Option<ResumeReport> {
        match self.phase {
            GatePhase::Settling { deadline } if now >= deadline => self.resume(tracker, geometry),
            _ => None,
        }
    }

    fn rewatch<S: ViewportProximitySource>(
        &self,
        tracker: &mut VisibilityTracker<S>,
        geometry: &dyn ViewportGeometry,
    ) -> ResumeReport {
        let viewport = geometry.viewport();
        let (near, far): (SmallVec<[ImageId; 16]>, SmallVec<[ImageId; 16]>) =
            tracker.watch_candidates().partition(|&image| {
                geometry
                    .image_rect(image)
                    .is_some_and(|rect| is_near_viewport(viewport, rect, self.resume_margin))
            });

        let mut report = ResumeReport::default();
        for image in near {
            if tracker.watch(image) {
                report.near += 1;
                report.watched += 1;
            }
        }
        for image in far {
            if tracker.watch(image) {
                report.watched += 1;
            }
        }
        tracker.reconnect();
        trace!(
            "Resumed: {} near viewport, {} watched in total",
            report.near, report.watched
        );
        report
    }
}
