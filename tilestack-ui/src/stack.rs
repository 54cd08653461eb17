//! Registry of image stacks and the layout pass that sizes them.
//!
//! ## Usage
//!
//! Register every stack once when the page is ready, then call
//! [`LayoutScheduler::request`] from resize notifications and
//! [`LayoutScheduler::on_frame`] once per display frame. Multiple requests
//! inside one frame collapse into a single [`StackRegistry::relayout`].

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use tracing::{debug, instrument, warn};

use crate::{
    config::{ConfigError, StackConfig, StackDataset},
    px::PxSize,
    quantize::{SnappedSize, snap},
    resolver::{ResolveError, resolve},
};

new_key_type! {
    /// Identity of a registered stack element.
    pub struct StackId;
}

/// The page surface stacks are measured against and written to.
pub trait StackSurface {
    /// Current viewport width in CSS pixels.
    fn viewport_width(&self) -> f64;

    /// Ratio of physical to CSS pixels.
    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }

    /// The box of the ancestor container of `stack`, if one exists.
    fn container_box(&self, stack: StackId) -> Option<PxSize>;

    /// Writes the final box onto the stack element.
    fn apply_box(&mut self, stack: StackId, size: SnappedSize);
}

/// Outcome of one layout pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutReport {
    /// Stacks whose box was written.
    pub applied: SmallVec<[(StackId, SnappedSize); 8]>,
    /// Stacks left untouched, with the reason.
    pub skipped: SmallVec<[(StackId, ResolveError); 2]>,
}

/// Stacks known to the page, built once and updated incrementally.
#[derive(Debug, Default)]
pub struct StackRegistry {
    stacks: SlotMap<StackId, StackConfig>,
}

impl StackRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and registers a stack.
    ///
    /// Stacks with invalid configuration are rejected; the caller should skip
    /// them and leave their current styling alone.
    pub fn register(&mut self, dataset: &StackDataset) -> Result<StackId, ConfigError> {
        let config = StackConfig::from_dataset(dataset)?;
        Ok(self.insert(config))
    }

    /// Registers an already-parsed configuration.
    pub fn insert(&mut self, config: StackConfig) -> StackId {
        self.stacks.insert(config)
    }

    /// Forgets a stack, returning its configuration.
    pub fn remove(&mut self, id: StackId) -> Option<StackConfig> {
        self.stacks.remove(id)
    }

    /// Looks up a stack's configuration.
    pub fn get(&self, id: StackId) -> Option<&StackConfig> {
        self.stacks.get(id)
    }

    /// Number of registered stacks.
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    /// Returns true when no stacks are registered.
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Resolves, snaps and applies the box of every stack.
    ///
    /// A stack that cannot be sized is logged and skipped; its siblings are
    /// still processed and its previous style is left in place.
    #[instrument(level = "debug", skip_all, fields(stacks = self.stacks.len()))]
    pub fn relayout(&self, surface: &mut dyn StackSurface) -> LayoutReport {
        let viewport_width = surface.viewport_width();
        let ratio = surface.device_pixel_ratio();
        let mut report = LayoutReport::default();

        for (id, config) in &self.stacks {
            let parent = if config.is_parent_size {
                surface.container_box(id)
            } else {
                None
            };
            match resolve(config, viewport_width, parent) {
                Ok(target) => {
                    let size = snap(target, config.snap, config.tile_px(), ratio);
                    debug!("Stack {id:?}: target {target:?} snapped to {size}");
                    surface.apply_box(id, size);
                    report.applied.push((id, size));
                }
                Err(err) => {
                    warn!("Skipping stack {id:?}: {err}");
                    report.skipped.push((id, err));
                }
            }
        }
        report
    }
}

/// Coalesces layout triggers to at most one pass per display frame.
#[derive(Debug, Default)]
pub struct LayoutScheduler {
    dirty: bool,
}

impl LayoutScheduler {
    /// Creates a scheduler with no pending work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks layout as stale (ready, window resize, container resize).
    pub fn request(&mut self) {
        self.dirty = true;
    }

    /// Returns true when a pass is pending.
    pub fn is_pending(&self) -> bool {
        self.dirty
    }

    /// Runs the pending pass, if any. Call once per frame.
    pub fn on_frame(
        &mut self,
        registry: &StackRegistry,
        surface: &mut dyn StackSurface,
    ) -> Option<LayoutReport> {
        if !std::mem::take(&mut self.dirty) {
            return None;
        }
        Some(registry.relayout(surface))
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap as HashMap;

    use super::*;
    use crate::{dimension::DimensionExpr, quantize::SnapMode};

    #[derive(Default)]
    struct FakeSurface {
        viewport_width: f64,
        ratio: f64,
        containers: HashMap<StackId, PxSize>,
        applied: Vec<(StackId, SnappedSize)>,
    }

    impl StackSurface for FakeSurface {
        fn viewport_width(&self) -> f64 {
            self.viewport_width
        }

        fn device_pixel_ratio(&self) -> f64 {
            self.ratio
        }

        fn container_box(&self, stack: StackId) -> Option<PxSize> {
            self.containers.get(&stack).copied()
        }

        fn apply_box(&mut self, stack: StackId, size: SnappedSize) {
            self.applied.push((stack, size));
        }
    }

    fn surface(viewport_width: f64) -> FakeSurface {
        FakeSurface {
            viewport_width,
            ratio: 1.0,
            ..FakeSurface::default()
        }
    }

    fn dataset(width: &str) -> StackDataset {
        StackDataset::new()
            .with("data-tile-size", "100")
            .with("data-natural-width", "1600")
            .with("data-natural-height", "900")
            .with("data-width", width)
    }

    #[test]
    fn end_to_end_half_width_stack() {
        let mut registry = StackRegistry::new();
        let id = registry.register(&dataset("50%")).expect("valid stack");

        let mut surface = surface(1280.0);
        let report = registry.relayout(&mut surface);

        let expected = SnappedSize {
            width: 800.0,
            height: 500.0,
        };
        assert_eq!(surface.applied, vec![(id, expected)]);
        assert_eq!(report.applied.as_slice(), &[(id, expected)]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn invalid_stack_is_never_registered() {
        let mut registry = StackRegistry::new();
        let broken = StackDataset::new().with("data-tile-size", "x");
        assert!(registry.register(&broken).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_container_skips_only_that_stack() {
        let mut registry = StackRegistry::new();
        let orphan = registry.register(&dataset("50%").with("data-parent-size", "true"));
        let orphan = orphan.expect("valid stack");
        let sibling = registry.register(&dataset("25%")).expect("valid stack");

        let mut surface = surface(1280.0);
        let report = registry.relayout(&mut surface);

        assert_eq!(
            report.skipped.as_slice(),
            &[(orphan, ResolveError::MissingContainer)]
        );
        assert_eq!(surface.applied.len(), 1);
        assert_eq!(surface.applied[0].0, sibling);
        assert_eq!(
            surface.applied[0].1,
            SnappedSize {
                width: 400.0,
                height: 200.0
            }
        );
    }

    #[test]
    fn container_relative_stack_uses_container_box() {
        let mut registry = StackRegistry::new();
        let config = StackConfig::new(48, PxSize::from_raw(1600, 900))
            .expect("valid config")
            .with_parent_size(true);
        let id = registry.insert(config);

        let mut surface = surface(1280.0);
        surface.containers.insert(id, PxSize::from_raw(960, 2000));
        registry.relayout(&mut surface);

        assert_eq!(
            surface.applied,
            vec![(
                id,
                SnappedSize {
                    width: 960.0,
                    height: 528.0
                }
            )]
        );
    }

    #[test]
    fn device_pixel_stacks_skip_the_tile_grid() {
        let mut registry = StackRegistry::new();
        let config = StackConfig::new(100, PxSize::from_raw(1600, 900))
            .expect("valid config")
            .with_width(DimensionExpr::Pixels(333))
            .with_snap(SnapMode::DevicePixel);
        let id = registry.insert(config);

        let mut surface = surface(1280.0);
        surface.ratio = 2.0;
        registry.relayout(&mut surface);

        assert_eq!(
            surface.applied,
            vec![(
                id,
                SnappedSize {
                    width: 333.0,
                    height: 187.0
                }
            )]
        );
    }

    #[test]
    fn scheduler_runs_once_per_frame() {
        let mut registry = StackRegistry::new();
        registry.register(&dataset("50%")).expect("valid stack");
        let mut scheduler = LayoutScheduler::new();
        let mut surface = surface(1280.0);

        assert!(scheduler.on_frame(&registry, &mut surface).is_none());

        scheduler.request();
        scheduler.request();
        scheduler.request();
        assert!(scheduler.is_pending());
        assert!(scheduler.on_frame(&registry, &mut surface).is_some());
        assert!(scheduler.on_frame(&registry, &mut surface).is_none());
        assert_eq!(surface.applied.len(), 1);
    }

    #[test]
    fn removed_stack_is_no_longer_sized() {
        let mut registry = StackRegistry::new();
        let id = registry.register(&dataset("50%")).expect("valid stack");
        assert!(registry.remove(id).is_some());

        let mut surface = surface(1280.0);
        let report = registry.relayout(&mut surface);
        assert!(report.applied.is_empty());
        assert!(surface.applied.is_empty());
    }
}
