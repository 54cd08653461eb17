//! Ports to the host's viewport: proximity notifications and direct geometry.
//!
//! ## Usage
//!
//! Implement [`ViewportProximitySource`] over the host's intersection
//! mechanism and [`ViewportGeometry`] over its layout queries. Entry batches
//! produced by the proximity mechanism are handed back through
//! [`crate::page::PageContext::on_proximity`].

use tilestack_ui::px::{Px, PxRect};

use crate::visibility::ImageId;

/// Default distance around the viewport that already counts as "near".
pub const DEFAULT_PROXIMITY_MARGIN: Px = Px(150);

/// The trigger region used when registering an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityRegion {
    /// How far outside the viewport an image may be and still trigger.
    pub margin: Px,
}

impl Default for ProximityRegion {
    fn default() -> Self {
        Self {
            margin: DEFAULT_PROXIMITY_MARGIN,
        }
    }
}

/// One proximity notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityEntry {
    /// The image the notification is about.
    pub image: ImageId,
    /// Whether the image is now inside the trigger region.
    pub is_intersecting: bool,
}

impl ProximityEntry {
    /// An "entered the region" notification.
    pub fn entered(image: ImageId) -> Self {
        Self {
            image,
            is_intersecting: true,
        }
    }

    /// A "left the region" notification.
    pub fn left(image: ImageId) -> Self {
        Self {
            image,
            is_intersecting: false,
        }
    }
}

/// The single proximity registration shared by every tracked image.
///
/// Implementations typically only report state *changes*; after a bulk
/// unregister/register cycle [`force_reevaluate`](Self::force_reevaluate)
/// must produce fresh entries for images already inside the region.
pub trait ViewportProximitySource {
    /// Starts watching `image`.
    fn register(&mut self, image: ImageId, region: ProximityRegion);

    /// Stops watching `image`. Unknown images are ignored.
    fn unregister(&mut self, image: ImageId);

    /// Re-checks every registered image against the current geometry.
    fn force_reevaluate(&mut self);
}

/// Direct layout queries, used when proximity notifications are stale.
pub trait ViewportGeometry {
    /// The visible viewport in document coordinates; `y` is the scroll offset.
    fn viewport(&self) -> PxRect;

    /// The document-space box of an image, if it is laid out.
    fn image_rect(&self, image: ImageId) -> Option<PxRect>;
}

/// Whether `rect` lies within `margin` of the viewport vertically.
///
/// ```
/// use tilestack_loader::proximity::is_near_viewport;
/// use tilestack_ui::px::{Px, PxRect};
///
/// let viewport = PxRect::new(Px::ZERO, Px::new(1000), Px::new(800), Px::new(600));
/// let below = PxRect::new(Px::ZERO, Px::new(1800), Px::new(800), Px::new(300));
/// assert!(is_near_viewport(viewport, below, Px::new(250)));
/// assert!(!is_near_viewport(viewport, below, Px::new(150)));
/// ```
pub fn is_near_viewport(viewport: PxRect, rect: PxRect, margin: Px) -> bool {
    viewport.expand_vertical(margin).overlaps_vertically(&rect)
}
