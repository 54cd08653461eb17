//! Target box resolution for a single stack.
//!
//! ## Usage
//!
//! Call [`resolve`] with the stack's config, the current viewport width and,
//! for container-relative stacks, the container box. Snap the result with
//! [`crate::quantize`] before applying it.
//!
//! Precedence, highest last:
//!
//! 1. natural size
//! 2. the first breakpoint whose `max_width` covers the viewport (only when no
//!    explicit width is set)
//! 3. the explicit width
//! 4. the explicit height, which re-derives the width from the aspect ratio
//!
//! Container-relative stacks with neither an explicit width nor a matching
//! breakpoint fill their container (`100%`).

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    config::StackConfig,
    dimension::{DimensionExpr, DimensionSpec},
    px::{Px, PxSize},
};

/// Geometry failures that make a stack unsizeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Container-relative sizing was requested but no container was found.
    #[error("stack is sized relative to its container but no container was found")]
    MissingContainer,
}

static FILL_CONTAINER: DimensionSpec = DimensionSpec::Expr(DimensionExpr::Percent(100.0));

/// Computes the unsnapped target box of a stack.
///
/// ```
/// use tilestack_ui::{
///     config::StackConfig,
///     dimension::DimensionExpr,
///     px::PxSize,
///     resolver::resolve,
/// };
///
/// let config = StackConfig::new(100, PxSize::from_raw(1600, 900))
///     .unwrap()
///     .with_width(DimensionExpr::Percent(50.0));
/// assert_eq!(resolve(&config, 1280.0, None), Ok(PxSize::from_raw(800, 450)));
/// ```
pub fn resolve(
    config: &StackConfig,
    viewport_width: f64,
    parent: Option<PxSize>,
) -> Result<PxSize, ResolveError> {
    let natural = config.natural;
    let base = if config.is_parent_size {
        parent.ok_or(ResolveError::MissingContainer)?
    } else {
        natural
    };
    let fallback = PxSize::new(
        positive_or(base.width, natural.width),
        positive_or(base.height, natural.height),
    );

    let width_spec = config
        .width
        .as_ref()
        .map(|spec| (spec, "explicit width"))
        .or_else(|| {
            config
                .breakpoints
                .iter()
                .find_map(|bp| bp.matching_width(viewport_width))
                .map(|spec| (spec, "breakpoint"))
        })
        .or_else(|| {
            config
                .is_parent_size
                .then_some((&FILL_CONTAINER, "container fill"))
        });

    let mut target = natural;
    if let Some((spec, source)) = width_spec {
        let width = spec.resolve(base.width.to_f64(), fallback.width);
        target = PxSize::new(width, proportional(width, natural.height, natural.width));
        trace!("Width from {source}: {spec:?} -> {target:?}");
    }

    if let Some(spec) = &config.height {
        let height = spec.resolve(base.height.to_f64(), fallback.height);
        target = PxSize::new(proportional(height, natural.width, natural.height), height);
        trace!("Height override: {spec:?} -> {target:?}");
    }

    if target != natural && !fits(target) {
        debug!("Resolved box {target:?} is degenerate; using natural size");
        return Ok(natural);
    }
    Ok(target)
}

fn positive_or(value: Px, fallback: Px) -> Px {
    if value.is_positive() { value } else { fallback }
}

/// `round(value * numerator / denominator)`, never below one pixel.
fn proportional(value: Px, numerator: Px, denominator: Px) -> Px {
    let scaled = Px::round_from_f64(value.to_f64() * numerator.to_f64() / denominator.to_f64());
    scaled.max(Px(1))
}

fn fits(size: PxSize) -> bool {
    size.is_positive() && size.width < Px::MAX && size.height < Px::MAX
}
