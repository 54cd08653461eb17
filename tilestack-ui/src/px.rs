//! Physical pixel geometry for image stacks.
//!
//! This module provides the integer pixel types every other part of the crate
//! speaks in: stack boxes produced by the resolver, container boxes reported
//! by the host, and document-space rectangles used for viewport proximity
//! checks.
//!
//! # Key Types
//!
//! - [`Px`] - A single physical pixel value that supports negative values for
//!   scroll offsets
//! - [`PxSize`] - A width/height pair; this is the resolved box of a stack
//! - [`PxRect`] - A rectangle in document coordinates
//!
//! # Coordinate System
//!
//! - Origin (0, 0) at the top-left corner of the document
//! - X-axis increases to the right
//! - Y-axis increases downward
//!
//! # Example
//!
//! ```
//! use tilestack_ui::px::{Px, PxRect, PxSize};
//!
//! let size = PxSize::new(Px::new(800), Px::new(450));
//! assert!(size.is_positive());
//!
//! let viewport = PxRect::new(Px::ZERO, Px::new(1000), Px::new(1280), Px::new(720));
//! assert_eq!(viewport.bottom(), Px::new(1720));
//! ```

use std::ops::{AddAssign, Neg, SubAssign};

/// A physical pixel value.
///
/// Stack sizes and document offsets are always whole pixels. Intermediate
/// math (percentages, aspect ratios) is done in `f64` and brought back with
/// [`Px::round_from_f64`], which pins the crate-wide rounding convention.
///
/// # Examples
///
/// ```
/// use tilestack_ui::px::Px;
///
/// let a = Px::new(100);
/// let b = Px::new(-50);
/// assert_eq!(a + b, Px::new(50));
///
/// // Half values round away from zero.
/// assert_eq!(Px::round_from_f64(4.5), Px::new(5));
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct Px(pub i32);

impl Px {
    /// A constant representing zero pixels.
    pub const ZERO: Self = Self(0);

    /// A constant representing the maximum possible pixel value.
    pub const MAX: Self = Self(i32::MAX);

    /// Creates a new `Px` instance from an i32 value.
    pub const fn new(value: i32) -> Self {
        Px(value)
    }

    /// Returns the raw i32 value.
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Returns the value as `f64`.
    pub fn to_f64(self) -> f64 {
        f64::from(self.0)
    }

    /// Rounds an `f64` to the nearest pixel, halves away from zero, saturating
    /// at the i32 bounds.
    ///
    /// Non-finite input maps to zero so callers can treat the result as
    /// "no usable size" and fall back.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilestack_ui::px::Px;
    ///
    /// assert_eq!(Px::round_from_f64(449.5), Px::new(450));
    /// assert_eq!(Px::round_from_f64(-2.5), Px::new(-3));
    /// assert_eq!(Px::round_from_f64(f64::NAN), Px::ZERO);
    /// assert_eq!(Px::round_from_f64(1e12), Px::MAX);
    /// ```
    pub fn round_from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Px::ZERO;
        }
        let clamped = value.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX));
        Px(clamped as i32)
    }

    /// Returns true when the value is strictly greater than zero.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Saturating integer addition.
    pub fn saturating_add(self, rhs: Self) -> Self {
        Px(self.0.saturating_add(rhs.0))
    }

    /// Saturating integer subtraction.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Px(self.0.saturating_sub(rhs.0))
    }
}

/// A width/height pair in physical pixels.
///
/// This is the resolved box of an image stack: recomputed on every layout
/// event and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PxSize {
    /// The width in physical pixels
    pub width: Px,
    /// The height in physical pixels
    pub height: Px,
}

impl PxSize {
    /// A constant representing zero size (0×0).
    pub const ZERO: Self = Self {
        width: Px(0),
        height: Px(0),
    };

    /// Creates a new size from width and height.
    pub const fn new(width: Px, height: Px) -> Self {
        Self { width, height }
    }

    /// Shorthand for building a size from raw integers.
    ///
    /// ```
    /// use tilestack_ui::px::{Px, PxSize};
    ///
    /// assert_eq!(PxSize::from_raw(16, 9), PxSize::new(Px::new(16), Px::new(9)));
    /// ```
    pub const fn from_raw(width: i32, height: i32) -> Self {
        Self {
            width: Px(width),
            height: Px(height),
        }
    }

    /// Returns true when both axes are strictly positive.
    pub fn is_positive(self) -> bool {
        self.width.is_positive() && self.height.is_positive()
    }
}

/// A rectangle in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PxRect {
    /// The x-coordinate of the top-left corner
    pub x: Px,
    /// The y-coordinate of the top-left corner
    pub y: Px,
    /// The width of the rectangle
    pub width: Px,
    /// The height of the rectangle
    pub height: Px,
}

impl PxRect {
    /// A constant representing a zero rectangle (0×0 at position (0, 0)).
    pub const ZERO: Self = Self {
        x: Px::ZERO,
        y: Px::ZERO,
        width: Px::ZERO,
        height: Px::ZERO,
    };

    /// Creates a new rectangle from position and size.
    pub const fn new(x: Px, y: Px, width: Px, height: Px) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The y-coordinate of the top edge.
    pub fn top(&self) -> Px {
        self.y
    }

    /// The y-coordinate of the bottom edge.
    pub fn bottom(&self) -> Px {
        self.y.saturating_add(self.height)
    }

    /// The size of the rectangle.
    pub fn size(&self) -> PxSize {
        PxSize::new(self.width, self.height)
    }

    /// Grows the rectangle by `margin` above and below.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilestack_ui::px::{Px, PxRect};
    ///
    /// let viewport = PxRect::new(Px::ZERO, Px::new(500), Px::new(800), Px::new(600));
    /// let band = viewport.expand_vertical(Px::new(250));
    /// assert_eq!(band.top(), Px::new(250));
    /// assert_eq!(band.bottom(), Px::new(1350));
    /// ```
    pub fn expand_vertical(&self, margin: Px) -> Self {
        let margin = Px(margin.0.max(0));
        Self {
            x: self.x,
            y: self.y.saturating_sub(margin),
            width: self.width,
            height: self.height.saturating_add(margin).saturating_add(margin),
        }
    }

    /// Checks whether two rectangles share any vertical span.
    ///
    /// Edges that merely touch do not count as overlapping.
    pub fn overlaps_vertically(&self, other: &Self) -> bool {
        other.bottom() > self.top() && other.top() < self.bottom()
    }
}

impl std::ops::Add for Px {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Px(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Px {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Px(self.0 - rhs.0)
    }
}

impl std::ops::Mul<i32> for Px {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self::Output {
        Px(self.0 * rhs)
    }
}

impl Neg for Px {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Px(-self.0)
    }
}

impl AddAssign for Px {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Px {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl From<i32> for Px {
    fn from(value: i32) -> Self {
        Px(value)
    }
}

impl From<[i32; 2]> for PxSize {
    fn from(size: [i32; 2]) -> Self {
        PxSize::from_raw(size[0], size[1])
    }
}
