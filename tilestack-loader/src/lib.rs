//! # Tilestack Loader
//!
//! Velocity-aware deferred loading for pages built from image stacks.
//!
//! Lazy images start as 1×1 placeholders carrying their real source. They are
//! watched for viewport proximity and get their source assigned as they come
//! near. While the page scrolls faster than a threshold, all watching stops so
//! a fling does not start hundreds of downloads; once the scroll has stayed
//! slow for a short settle delay, images near the viewport are picked up
//! again.
//!
//! The host integrates through three ports:
//!
//! - [`proximity::ViewportProximitySource`]: the intersection mechanism,
//! - [`proximity::ViewportGeometry`] and [`tilestack_ui::stack::StackSurface`]:
//!   layout queries and style writes,
//! - [`visibility::ImageHost`]: source assignment and decode completion.
//!
//! [`page::PageContext`] ties them together with stack layout from
//! [`tilestack_ui`].
//!
//! ```
//! use futures::executor::LocalPool;
//! use tilestack_loader::{
//!     ImageHost, ImageId, LoaderConfig, PageContext, ProximityRegion, ViewportProximitySource,
//!     visibility::DecodedImage,
//! };
//!
//! struct NoProximity;
//!
//! impl ViewportProximitySource for NoProximity {
//!     fn register(&mut self, _: ImageId, _: ProximityRegion) {}
//!     fn unregister(&mut self, _: ImageId) {}
//!     fn force_reevaluate(&mut self) {}
//! }
//!
//! struct NoHost;
//!
//! impl ImageHost for NoHost {
//!     type Decode = std::future::Ready<Option<DecodedImage>>;
//!
//!     fn assign_source(&self, _: ImageId, _: &str) -> Self::Decode {
//!         std::future::ready(None)
//!     }
//!
//!     fn mark_loaded(&self, _: ImageId) {}
//! }
//!
//! let pool = LocalPool::new();
//! let mut page = PageContext::new(LoaderConfig::default(), NoProximity, NoHost, pool.spawner());
//! let image = page.add_image(Some("photo.jpg".to_string()));
//! assert!(page.image_state(image).is_some());
//! ```
#![deny(missing_docs, clippy::unwrap_used)]

pub mod gate;
pub mod page;
pub mod proximity;
pub mod velocity;
pub mod visibility;


#[cfg(not(target_family = "wasm"))]
pub use std::time::Instant;
#[cfg(target_family = "wasm")]
pub use web_time::Instant;

pub use gate::{GatePhase, LoadGateController, ResumeReport};
pub use page::{FrameReport, LoaderConfig, PageContext, PageSurface};
pub use proximity::{ProximityEntry, ProximityRegion, ViewportGeometry, ViewportProximitySource};
pub use velocity::{ScrollVelocityMonitor, SpeedState, SpeedTransition};
pub use visibility::{DecodedImage, ImageHost, ImageId, LoadState, VisibilityTracker};
