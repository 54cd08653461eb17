//! tilestack-ui sizes tiled image stacks.
//!
//! A stack is a box of layered image tiles sized as one unit. Its size comes
//! from the intrinsic image size, optional container-relative percentages,
//! responsive breakpoints and explicit overrides, and is finally snapped to
//! the tile grid (or the device pixel grid).
//!
//! # Sizing a stack
//!
//! ```
//! use tilestack_ui::{
//!     config::{StackConfig, StackDataset},
//!     px::Px,
//!     quantize::quantize,
//!     resolver::resolve,
//! };
//!
//! let dataset = StackDataset::new()
//!     .with("data-tile-size", "100")
//!     .with("data-natural-width", "1600")
//!     .with("data-natural-height", "900")
//!     .with("data-width", "50%");
//! let config = StackConfig::from_dataset(&dataset).unwrap();
//!
//! let target = resolve(&config, 1280.0, None).unwrap();
//! let snapped = quantize(target, config.tile_px());
//! assert_eq!((snapped.width, snapped.height), (Px::new(800), Px::new(500)));
//! ```
//!
//! # Sizing a page
//!
//! Register every stack in a [`StackRegistry`] once, implement
//! [`StackSurface`] for the host page, and drive a [`LayoutScheduler`] from
//! resize notifications and the frame callback.
//!
//! Rounding is pinned to "half away from zero" everywhere (`f64::round`).
#![deny(missing_docs, clippy::unwrap_used)]

pub mod config;
pub mod dimension;
pub mod logging;
pub mod px;
pub mod quantize;
pub mod resolver;
pub mod stack;
pub mod tiles;

pub use crate::{
    config::{Breakpoint, ConfigError, StackConfig, StackDataset},
    dimension::{DimensionError, DimensionExpr, DimensionSpec},
    px::{Px, PxRect, PxSize},
    quantize::{SnapMode, SnappedSize},
    resolver::ResolveError,
    stack::{LayoutReport, LayoutScheduler, StackId, StackRegistry, StackSurface},
};
