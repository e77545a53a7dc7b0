//! Plate crop binarization ahead of recognition.
//!
//! Plate photographs carry uneven lighting, glare, and background texture;
//! recognition runs once on the raw crop and once on the output of this
//! pipeline, and the reconciler picks between them.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::bilateral_filter;

/// Bilateral smoothing window, in pixels.
const SMOOTH_WINDOW: u32 = 11;
/// Shared color/spatial sigma for the bilateral filter.
const SMOOTH_SIGMA: f32 = 17.0;
/// Side length of the local mean window used for thresholding.
const THRESHOLD_BLOCK: u32 = 11;
/// Constant subtracted from the local mean before comparison.
const THRESHOLD_OFFSET: i32 = 2;

/// Binarizes a plate crop.
///
/// Grayscale, edge-preserving smoothing, mean-based adaptive thresholding,
/// then a morphological close and open with a 2x2 element to fill gaps
/// inside characters and drop isolated speckles. Deterministic; the output
/// has the input's dimensions and contains only 0 and 255 pixels.
pub fn binarize_plate(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let smoothed = bilateral_filter(&gray, SMOOTH_WINDOW, SMOOTH_SIGMA, SMOOTH_SIGMA);
    let binary = adaptive_mean_threshold(&smoothed, THRESHOLD_BLOCK, THRESHOLD_OFFSET);
    let closed = erode2x2(&dilate2x2(&binary));
    dilate2x2(&erode2x2(&closed))
}

/// Binarizes against the mean of the surrounding `block_size` square,
/// shifted by `offset`. The window is clamped at the borders, so edge
/// pixels compare against the mean of the in-bounds portion.
fn adaptive_mean_threshold(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    // integral[(y + 1) * (w + 1) + x + 1] holds the pixel sum of [0..=x, 0..=y].
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += u64::from(image.get_pixel(x as u32, y as u32)[0]);
            integral[(y + 1) * (w + 1) + x + 1] = integral[y * (w + 1) + x + 1] + row_sum;
        }
    }

    let radius = i64::from(block_size / 2);
    let mut out = GrayImage::new(width, height);
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let x0 = (x - radius).max(0) as usize;
            let y0 = (y - radius).max(0) as usize;
            let x1 = (x + radius).min(w as i64 - 1) as usize + 1;
            let y1 = (y + radius).min(h as i64 - 1) as usize + 1;

            let sum = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + x1]
                - integral[y1 * (w + 1) + x0];
            let count = ((x1 - x0) * (y1 - y0)) as u64;
            let mean = (sum / count) as i32;

            let pixel = i32::from(image.get_pixel(x as u32, y as u32)[0]);
            let value = if pixel > mean - offset { 255 } else { 0 };
            out.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }
    out
}

fn dilate2x2(image: &GrayImage) -> GrayImage {
    morph2x2(image, &[(0, 0), (1, 0), (0, 1), (1, 1)], u8::max)
}

// Erosion uses the reflected element so that close/open do not shift shapes.
fn erode2x2(image: &GrayImage) -> GrayImage {
    morph2x2(image, &[(0, 0), (-1, 0), (0, -1), (-1, -1)], u8::min)
}

/// Applies a 2x2 structuring element, replicating the border row/column
/// where the element overhangs the image.
fn morph2x2(image: &GrayImage, offsets: &[(i64, i64)], fold: fn(u8, u8) -> u8) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let mut acc = None;
            for (dx, dy) in offsets {
                let nx = (i64::from(x) + dx).clamp(0, i64::from(width) - 1) as u32;
                let ny = (i64::from(y) + dy).clamp(0, i64::from(height) - 1) as u32;
                let value = image.get_pixel(nx, ny)[0];
                acc = Some(match acc {
                    Some(current) => fold(current, value),
                    None => value,
                });
            }
            out.put_pixel(x, y, Luma([acc.unwrap_or(0)]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample_crop() -> DynamicImage {
        // Dark glyph-like blocks on an unevenly lit background.
        DynamicImage::ImageRgb8(image::ImageBuffer::from_fn(64, 24, |x, y| {
            let lighting = 150 + (x / 2) as u8;
            if (10..14).contains(&x) && (6..18).contains(&y)
                || (30..34).contains(&x) && (6..18).contains(&y)
            {
                Rgb([40, 40, 40])
            } else {
                Rgb([lighting, lighting, lighting])
            }
        }))
    }

    #[test]
    fn preserves_dimensions() {
        let crop = sample_crop();
        let binary = binarize_plate(&crop);
        assert_eq!(binary.dimensions(), (64, 24));
    }

    #[test]
    fn output_is_strictly_binary() {
        let binary = binarize_plate(&sample_crop());
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn deterministic_for_identical_input() {
        let crop = sample_crop();
        assert_eq!(binarize_plate(&crop), binarize_plate(&crop));
    }

    #[test]
    fn uniform_image_thresholds_to_white() {
        // Every pixel equals the local mean, and the offset keeps it above
        // the cutoff.
        let flat = GrayImage::from_pixel(20, 12, Luma([128]));
        let out = adaptive_mean_threshold(&flat, 11, 2);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn dark_glyphs_survive_binarization() {
        let binary = binarize_plate(&sample_crop());
        // The glyph interiors stay black, the lit background goes white.
        assert_eq!(binary.get_pixel(11, 12)[0], 0);
        assert_eq!(binary.get_pixel(50, 12)[0], 255);
    }

    #[test]
    fn close_fills_single_pixel_gap() {
        let mut img = GrayImage::from_pixel(8, 8, Luma([0]));
        for y in 0..8 {
            img.put_pixel(3, y, Luma([255]));
            img.put_pixel(4, y, Luma([255]));
        }
        // One-pixel hole inside the white bar.
        img.put_pixel(3, 4, Luma([0]));

        let closed = erode2x2(&dilate2x2(&img));
        assert_eq!(closed.get_pixel(3, 4)[0], 255);
        // The bar itself keeps its footprint.
        assert_eq!(closed.get_pixel(2, 4)[0], 0);
        assert_eq!(closed.get_pixel(5, 4)[0], 0);
    }

    #[test]
    fn open_removes_isolated_speckle() {
        let mut img = GrayImage::from_pixel(8, 8, Luma([0]));
        img.put_pixel(5, 5, Luma([255]));

        let opened = dilate2x2(&erode2x2(&img));
        assert!(opened.pixels().all(|p| p[0] == 0));
    }
}
