//! Checkerboard tiling of a decoded image into the two layers of a stack.
//!
//! ## Usage
//!
//! Split an RGBA buffer with [`split_checkerboard`], or run the whole
//! derivative pipeline (optional distortion, optional split) with
//! [`build_layers`]. The returned tile size and cropped dimensions are
//! exactly the `tile-size` / `natural-width` / `natural-height` attributes a
//! stack needs.

use std::ops::RangeInclusive;

use image::{Rgba, RgbaImage, imageops};
use rand::Rng;

/// Range of hue rotations, in degrees, a random distortion picks from.
pub const HUE_ROTATION_RANGE: RangeInclusive<i32> = 30..=180;

/// Picks a tile size from the longest side of an image.
///
/// ```
/// use tilestack_ui::tiles::choose_tile_size;
///
/// assert_eq!(choose_tile_size(4000, 3000), 48);
/// assert_eq!(choose_tile_size(1024, 768), 24);
/// assert_eq!(choose_tile_size(640, 480), 12);
/// ```
pub fn choose_tile_size(width: u32, height: u32) -> u32 {
    match width.max(height) {
        longest if longest > 1536 => 48,
        longest if longest > 768 => 24,
        _ => 12,
    }
}

/// Crops `image` from the top-left so both sides are multiples of `tile`.
pub fn crop_to_divisible(image: &RgbaImage, tile: u32) -> RgbaImage {
    let tile = tile.max(1);
    let width = image.width() - image.width() % tile;
    let height = image.height() - image.height() % tile;
    imageops::crop_imm(image, 0, 0, width, height).to_image()
}

/// The two complementary layers of an image stack.
#[derive(Debug, Clone)]
pub struct TileLayers {
    /// Tiles where `(column + row)` is even; everything else transparent.
    pub first: RgbaImage,
    /// The remaining tiles.
    pub second: RgbaImage,
    /// Edge length of one tile.
    pub tile_size: u32,
    /// Width after cropping.
    pub width: u32,
    /// Height after cropping.
    pub height: u32,
}

/// Splits an image into two checkerboard layers.
///
/// Stacking both layers reproduces the cropped source exactly.
pub fn split_checkerboard(image: &RgbaImage) -> TileLayers {
    let tile_size = choose_tile_size(image.width(), image.height());
    let cropped = crop_to_divisible(image, tile_size);
    let (width, height) = cropped.dimensions();

    let transparent = Rgba([0, 0, 0, 0]);
    let mut first = RgbaImage::from_pixel(width, height, transparent);
    let mut second = RgbaImage::from_pixel(width, height, transparent);

    for (x, y, pixel) in cropped.enumerate_pixels() {
        if ((x / tile_size) + (y / tile_size)) % 2 == 0 {
            first.put_pixel(x, y, *pixel);
        } else {
            second.put_pixel(x, y, *pixel);
        }
    }

    TileLayers {
        first,
        second,
        tile_size,
        width,
        height,
    }
}

/// Rotates the hue of every pixel by `hue_rotation` degrees, then inverts
/// the colour channels. The result is fully opaque.
pub fn distort_image(image: &RgbaImage, hue_rotation: i32) -> RgbaImage {
    let mut distorted = imageops::huerotate(image, hue_rotation);
    imageops::invert(&mut distorted);
    for pixel in distorted.pixels_mut() {
        pixel[3] = u8::MAX;
    }
    distorted
}

/// Picks a hue rotation from [`HUE_ROTATION_RANGE`].
pub fn random_hue_rotation<R: Rng>(rng: &mut R) -> i32 {
    rng.gen_range(HUE_ROTATION_RANGE)
}

/// Which derivatives [`build_layers`] produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerOptions {
    /// Distort colours with a random hue rotation and inversion first.
    pub distort: bool,
    /// Split into two checkerboard layers instead of one image.
    pub split: bool,
}

/// The stored derivatives of one source image.
#[derive(Debug, Clone)]
pub struct StackLayers {
    /// The single derivative, or the first checkerboard layer.
    pub first: RgbaImage,
    /// The second checkerboard layer, when split.
    pub second: Option<RgbaImage>,
    /// Tile edge length, when split.
    pub tile_size: Option<u32>,
    /// Width of the stored derivative(s).
    pub width: u32,
    /// Height of the stored derivative(s).
    pub height: u32,
    /// Applied hue rotation in degrees, when distorted.
    pub hue_rotation: Option<i32>,
}

/// Builds the derivatives of `source` using the thread-local RNG.
pub fn build_layers(source: &RgbaImage, options: LayerOptions) -> StackLayers {
    build_layers_with_rng(source, options, &mut rand::thread_rng())
}

/// [`build_layers`] with a caller-supplied RNG.
pub fn build_layers_with_rng<R: Rng>(
    source: &RgbaImage,
    options: LayerOptions,
    rng: &mut R,
) -> StackLayers {
    let hue_rotation = options.distort.then(|| random_hue_rotation(rng));
    let distorted = hue_rotation.map(|degrees| distort_image(source, degrees));
    let image = distorted.as_ref().unwrap_or(source);

    if options.split {
        let layers = split_checkerboard(image);
        return StackLayers {
            first: layers.first,
            second: Some(layers.second),
            tile_size: Some(layers.tile_size),
            width: layers.width,
            height: layers.height,
            hue_rotation,
        };
    }

    let (width, height) = image.dimensions();
    StackLayers {
        first: image.clone(),
        second: None,
        tile_size: None,
        width,
        height,
        hue_rotation,
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 7, 255]))
    }

    #[test]
    fn tile_size_thresholds_are_exclusive() {
        assert_eq!(choose_tile_size(1536, 10), 24);
        assert_eq!(choose_tile_size(1537, 10), 48);
        assert_eq!(choose_tile_size(10, 768), 12);
        assert_eq!(choose_tile_size(10, 769), 24);
    }

    #[test]
    fn crop_drops_partial_tiles() {
        let cropped = crop_to_divisible(&gradient(50, 37), 12);
        assert_eq!(cropped.dimensions(), (48, 36));
        assert_eq!(cropped.get_pixel(47, 35), &Rgba([47, 35, 7, 255]));
    }

    #[test]
    fn layers_are_complementary() {
        let source = gradient(30, 26);
        let layers = split_checkerboard(&source);

        assert_eq!(layers.tile_size, 12);
        assert_eq!((layers.width, layers.height), (24, 24));

        for y in 0..layers.height {
            for x in 0..layers.width {
                let a = layers.first.get_pixel(x, y);
                let b = layers.second.get_pixel(x, y);
                let expected = source.get_pixel(x, y);
                let (visible, hidden) = if ((x / 12) + (y / 12)) % 2 == 0 {
                    (a, b)
                } else {
                    (b, a)
                };
                assert_eq!(visible, expected);
                assert_eq!(hidden[3], 0);
            }
        }
    }

    #[test]
    fn distortion_inverts_and_drops_alpha() {
        let mut source = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 40]));
        source.put_pixel(1, 1, Rgba([128, 128, 128, 255]));
        let distorted = distort_image(&source, 90);

        assert_eq!(distorted.dimensions(), (4, 4));
        assert_eq!(distorted.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        // Greys have no hue; only the inversion shows.
        let grey = distorted.get_pixel(1, 1);
        for channel in &grey.0[..3] {
            assert!((126..=128).contains(channel), "grey became {grey:?}");
        }
    }

    #[test]
    fn random_rotation_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(HUE_ROTATION_RANGE.contains(&random_hue_rotation(&mut rng)));
        }
    }

    #[test]
    fn plain_single_layer() {
        let source = gradient(30, 26);
        let layers = build_layers(&source, LayerOptions::default());

        assert_eq!(layers.first, source);
        assert!(layers.second.is_none());
        assert_eq!(layers.tile_size, None);
        assert_eq!((layers.width, layers.height), (30, 26));
        assert_eq!(layers.hue_rotation, None);
    }

    #[test]
    fn distorted_split_layers() {
        let source = gradient(30, 26);
        let mut rng = StdRng::seed_from_u64(42);
        let options = LayerOptions {
            distort: true,
            split: true,
        };
        let layers = build_layers_with_rng(&source, options, &mut rng);

        let degrees = layers.hue_rotation.expect("distorted");
        assert!(HUE_ROTATION_RANGE.contains(&degrees));
        assert_eq!(layers.tile_size, Some(12));
        assert_eq!((layers.width, layers.height), (24, 24));

        let expected = split_checkerboard(&distort_image(&source, degrees));
        assert_eq!(layers.first, expected.first);
        assert_eq!(layers.second, Some(expected.second));
    }
}
