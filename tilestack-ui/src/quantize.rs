//! Snapping resolved boxes onto a tile grid or the device pixel grid.
//!
//! Each axis is snapped on its own, so the aspect ratio of the input box may
//! drift by up to half a grid unit per axis. The snapped size is the final
//! authority over the resolved one.

use std::fmt;

use crate::px::{Px, PxSize};

/// The grid a stack's final size snaps to, chosen per stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SnapMode {
    /// Round each axis to the nearest multiple of the tile size.
    #[default]
    TileGrid,
    /// Round each axis to the nearest physical device pixel.
    DevicePixel,
}

/// Snaps both axes to the nearest multiple of `tile_size`.
///
/// Halves round away from zero, so `450` on a `100` grid becomes `500`.
/// A non-positive tile size leaves the box untouched.
///
/// ```
/// use tilestack_ui::{px::{Px, PxSize}, quantize::quantize};
///
/// let snapped = quantize(PxSize::from_raw(800, 450), Px::new(100));
/// assert_eq!(snapped, PxSize::from_raw(800, 500));
/// ```
pub fn quantize(size: PxSize, tile_size: Px) -> PxSize {
    if !tile_size.is_positive() {
        return size;
    }
    PxSize::new(
        quantize_axis(size.width, tile_size),
        quantize_axis(size.height, tile_size),
    )
}

fn quantize_axis(value: Px, tile_size: Px) -> Px {
    let tiles = (value.to_f64() / tile_size.to_f64()).round();
    Px::round_from_f64(tiles * tile_size.to_f64())
}

/// Snaps both axes to `round(px * ratio) / ratio`.
///
/// Ratios that are not finite and positive are treated as `1.0`.
///
/// ```
/// use tilestack_ui::{px::PxSize, quantize::snap_to_device_pixels};
///
/// let snapped = snap_to_device_pixels(PxSize::from_raw(101, 50), 1.5);
/// assert!((snapped.width - 152.0 / 1.5).abs() < 1e-9);
/// assert_eq!(snapped.height, 50.0);
/// ```
pub fn snap_to_device_pixels(size: PxSize, ratio: f64) -> SnappedSize {
    let ratio = if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    };
    let snap = |value: Px| (value.to_f64() * ratio).round() / ratio;
    SnappedSize {
        width: snap(size.width),
        height: snap(size.height),
    }
}

/// Applies the snapping `mode` to a resolved box.
pub fn snap(size: PxSize, mode: SnapMode, tile_size: Px, device_pixel_ratio: f64) -> SnappedSize {
    match mode {
        SnapMode::TileGrid => quantize(size, tile_size).into(),
        SnapMode::DevicePixel => snap_to_device_pixels(size, device_pixel_ratio),
    }
}

/// The box size written onto a stack, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnappedSize {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
}

impl SnappedSize {
    /// Renders the inline style for the stack element.
    ///
    /// ```
    /// use tilestack_ui::{px::PxSize, quantize::SnappedSize};
    ///
    /// let size = SnappedSize::from(PxSize::from_raw(800, 500));
    /// assert_eq!(size.css(), "width: 800px; height: 500px;");
    /// ```
    pub fn css(&self) -> String {
        format!("width: {}px; height: {}px;", self.width, self.height)
    }
}

impl From<PxSize> for SnappedSize {
    fn from(size: PxSize) -> Self {
        Self {
            width: size.width.to_f64(),
            height: size.height.to_f64(),
        }
    }
}

impl fmt::Display for SnappedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
