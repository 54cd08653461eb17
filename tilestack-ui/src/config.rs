//! Per-stack configuration read from markup.
//!
//! ## Usage
//!
//! Collect a stack's data attributes into a [`StackDataset`] and parse it
//! with [`StackConfig::from_dataset`]. A stack whose configuration does not
//! parse is skipped entirely; it is never partially sized.

use rustc_hash::FxHashMap as HashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    dimension::{DimensionExpr, DimensionSpec, parse_integer_prefix},
    px::{Px, PxSize},
    quantize::SnapMode,
};

/// Attribute holding the tile grid unit.
pub const ATTR_TILE_SIZE: &str = "tile-size";
/// Attribute holding the intrinsic width.
pub const ATTR_NATURAL_WIDTH: &str = "natural-width";
/// Attribute holding the intrinsic height.
pub const ATTR_NATURAL_HEIGHT: &str = "natural-height";
/// Attribute selecting container-relative sizing.
pub const ATTR_PARENT_SIZE: &str = "parent-size";
/// Attribute holding the explicit width expression.
pub const ATTR_WIDTH: &str = "width";
/// Attribute holding the explicit height expression.
pub const ATTR_HEIGHT: &str = "height";
/// Attribute holding the JSON breakpoint list.
pub const ATTR_BREAKPOINTS: &str = "breakpoints";
/// Attribute selecting the snapping grid.
pub const ATTR_SNAP: &str = "snap";

/// Errors that disqualify a stack from sizing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required attribute is absent.
    #[error("missing required attribute `{0}`")]
    Missing(&'static str),
    /// A required attribute is not an integer.
    #[error("attribute `{attribute}` is not an integer: `{value}`")]
    InvalidInteger {
        /// Attribute name.
        attribute: &'static str,
        /// Raw attribute text.
        value: String,
    },
    /// A required attribute is zero, negative or out of range.
    #[error("attribute `{attribute}` must be a positive pixel count, got {value}")]
    NonPositive {
        /// Attribute name.
        attribute: &'static str,
        /// Parsed value.
        value: i64,
    },
}

/// The string data attributes of one stack element.
///
/// Keys are normalised on insert so `data-tile-size`, `tileSize` and
/// `tile_size` all address the same attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackDataset {
    values: HashMap<String, String>,
}

impl StackDataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an attribute, replacing any earlier value.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values.insert(normalize_key(key.as_ref()), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Looks up an attribute by any of its spellings.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for StackDataset {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut dataset = Self::new();
        for (key, value) in iter {
            dataset.insert(key, value);
        }
        dataset
    }
}

fn normalize_key(key: &str) -> String {
    let key = key.trim();
    let key = key.strip_prefix("data-").unwrap_or(key);
    let mut normalized = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        match ch {
            '_' => normalized.push('-'),
            ch if ch.is_ascii_uppercase() => {
                if !normalized.is_empty() {
                    normalized.push('-');
                }
                normalized.push(ch.to_ascii_lowercase());
            }
            ch => normalized.push(ch),
        }
    }
    normalized
}

/// A responsive width override.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    /// Largest viewport width (inclusive) this entry applies to.
    pub max_width: f64,
    /// Width applied when the entry matches; entries without one never match.
    pub width: Option<DimensionSpec>,
}

impl Breakpoint {
    /// Creates a breakpoint with a width expression.
    pub fn new(max_width: f64, width: impl Into<DimensionSpec>) -> Self {
        Self {
            max_width,
            width: Some(width.into()),
        }
    }

    /// Returns the width when this entry applies to `viewport_width`.
    pub fn matching_width(&self, viewport_width: f64) -> Option<&DimensionSpec> {
        if viewport_width <= self.max_width {
            self.width.as_ref()
        } else {
            None
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBreakpoint {
    max_width: f64,
    #[serde(default)]
    width: Option<serde_json::Value>,
}

impl From<RawBreakpoint> for Breakpoint {
    fn from(raw: RawBreakpoint) -> Self {
        let width = raw.width.and_then(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(token) if token.trim().is_empty() => None,
            serde_json::Value::String(token) => Some(DimensionSpec::from_token(&token)),
            serde_json::Value::Number(number) if number.as_f64() == Some(0.0) => None,
            serde_json::Value::Number(number) => Some(match number.as_i64() {
                Some(pixels) => DimensionSpec::Expr(DimensionExpr::Pixels(pixels)),
                None => match number.as_f64() {
                    Some(pixels) if pixels.is_finite() => {
                        DimensionSpec::Expr(DimensionExpr::Pixels(pixels.trunc() as i64))
                    }
                    _ => DimensionSpec::Invalid(number.to_string()),
                },
            }),
            other => Some(DimensionSpec::Invalid(other.to_string())),
        });
        Self {
            max_width: raw.max_width,
            width,
        }
    }
}

/// Parses a serialized breakpoint list; malformed input yields an empty list.
///
/// ```
/// use tilestack_ui::config::parse_breakpoints;
///
/// let parsed = parse_breakpoints(r#"[{"maxWidth": 480, "width": "100%"}]"#);
/// assert_eq!(parsed.len(), 1);
/// assert!(parse_breakpoints("not json").is_empty());
/// ```
pub fn parse_breakpoints(serialized: &str) -> Vec<Breakpoint> {
    if serialized.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<RawBreakpoint>>(serialized) {
        Ok(raw) => raw.into_iter().map(Breakpoint::from).collect(),
        Err(err) => {
            tracing::warn!("Malformed breakpoints `{serialized}`: {err}; ignoring them");
            Vec::new()
        }
    }
}

/// Immutable configuration of one image stack.
#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    /// Grid unit for final quantization, always positive.
    pub tile_size: u32,
    /// Intrinsic size, both axes positive.
    pub natural: PxSize,
    /// Whether percentages resolve against the ancestor container.
    pub is_parent_size: bool,
    /// Explicit width override.
    pub width: Option<DimensionSpec>,
    /// Explicit height override.
    pub height: Option<DimensionSpec>,
    /// Responsive widths, first match wins.
    pub breakpoints: Vec<Breakpoint>,
    /// Which grid the final size snaps to.
    pub snap: SnapMode,
}

impl StackConfig {
    /// Creates a config, validating the tile size and natural size.
    pub fn new(tile_size: u32, natural: PxSize) -> Result<Self, ConfigError> {
        if tile_size == 0 || i32::try_from(tile_size).is_err() {
            return Err(ConfigError::NonPositive {
                attribute: ATTR_TILE_SIZE,
                value: i64::from(tile_size),
            });
        }
        if !natural.width.is_positive() {
            return Err(ConfigError::NonPositive {
                attribute: ATTR_NATURAL_WIDTH,
                value: i64::from(natural.width.raw()),
            });
        }
        if !natural.height.is_positive() {
            return Err(ConfigError::NonPositive {
                attribute: ATTR_NATURAL_HEIGHT,
                value: i64::from(natural.height.raw()),
            });
        }
        Ok(Self {
            tile_size,
            natural,
            is_parent_size: false,
            width: None,
            height: None,
            breakpoints: Vec::new(),
            snap: SnapMode::TileGrid,
        })
    }

    /// Sets container-relative sizing.
    pub fn with_parent_size(mut self, is_parent_size: bool) -> Self {
        self.is_parent_size = is_parent_size;
        self
    }

    /// Sets the explicit width.
    pub fn with_width(mut self, width: impl Into<DimensionSpec>) -> Self {
        self.width = Some(width.into());
        self
    }

    /// Sets the explicit height.
    pub fn with_height(mut self, height: impl Into<DimensionSpec>) -> Self {
        self.height = Some(height.into());
        self
    }

    /// Replaces the breakpoint list.
    pub fn with_breakpoints(mut self, breakpoints: Vec<Breakpoint>) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    /// Selects the snapping grid.
    pub fn with_snap(mut self, snap: SnapMode) -> Self {
        self.snap = snap;
        self
    }

    /// Tile size as a pixel value.
    pub fn tile_px(&self) -> Px {
        Px(i32::try_from(self.tile_size).unwrap_or(i32::MAX))
    }

    /// Parses a stack's data attributes.
    ///
    /// ```
    /// use tilestack_ui::config::{StackConfig, StackDataset};
    ///
    /// let dataset = StackDataset::new()
    ///     .with("data-tile-size", "100")
    ///     .with("data-natural-width", "1600")
    ///     .with("data-natural-height", "900")
    ///     .with("data-width", "50%");
    /// let config = StackConfig::from_dataset(&dataset).unwrap();
    /// assert_eq!(config.tile_size, 100);
    /// assert!(!config.is_parent_size);
    /// ```
    pub fn from_dataset(dataset: &StackDataset) -> Result<Self, ConfigError> {
        let tile_size = required_positive(dataset, ATTR_TILE_SIZE)?;
        let natural_width = required_positive(dataset, ATTR_NATURAL_WIDTH)?;
        let natural_height = required_positive(dataset, ATTR_NATURAL_HEIGHT)?;

        let mut config = Self::new(
            tile_size.unsigned_abs(),
            PxSize::from_raw(natural_width, natural_height),
        )?;
        config.is_parent_size = dataset.get(ATTR_PARENT_SIZE) == Some("true");
        config.width = non_blank(dataset, ATTR_WIDTH).map(DimensionSpec::from_token);
        config.height = non_blank(dataset, ATTR_HEIGHT).map(DimensionSpec::from_token);
        config.breakpoints = non_blank(dataset, ATTR_BREAKPOINTS)
            .map(parse_breakpoints)
            .unwrap_or_default();
        config.snap = match dataset.get(ATTR_SNAP).map(str::trim) {
            Some("device") => SnapMode::DevicePixel,
            _ => SnapMode::TileGrid,
        };
        Ok(config)
    }
}

/// Blank attributes count as absent.
fn non_blank<'a>(dataset: &'a StackDataset, attribute: &str) -> Option<&'a str> {
    dataset.get(attribute).filter(|value| !value.trim().is_empty())
}

fn required_positive(dataset: &StackDataset, attribute: &'static str) -> Result<i32, ConfigError> {
    let raw = dataset.get(attribute).ok_or(ConfigError::Missing(attribute))?;
    let value = parse_integer_prefix(raw).ok_or_else(|| ConfigError::InvalidInteger {
        attribute,
        value: raw.to_string(),
    })?;
    match i32::try_from(value) {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::NonPositive { attribute, value }),
    }
}
