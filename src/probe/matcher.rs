//! Template matching on captured frames.
//!
//! Similarity is `1 - SAD / max_SAD` over RGB channels, so `1.0` is a pixel-exact
//! match and the score falls monotonically as pixels diverge. Each candidate
//! position is first summed over a sparse sample grid of the template. The
//! sampled sum is a lower bound of the full SAD, so a position is only rejected
//! there once it already exceeds the whole template's budget; every other
//! position gets a full comparison.

use image::RgbImage;

/// Largest per-pixel difference (three channels of 255).
const MAX_PIXEL_DIFF: f64 = 765.0;

/// Sample grid resolution per axis for the pre-filter.
const SAMPLE_GRID: u32 = 8;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Match {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub score: f64,
}

/// Find the first position (row-major) where `needle` scores at least
/// `confidence` inside `haystack`.
pub fn locate(haystack: &RgbImage, needle: &RgbImage, confidence: f64) -> Option<Match> {
    let (hw, hh) = haystack.dimensions();
    let (nw, nh) = needle.dimensions();
    if nw == 0 || nh == 0 || nw > hw || nh > hh {
        return None;
    }
    let confidence = confidence.clamp(0.0, 1.0);

    let samples = sample_points(nw, nh);
    let budget = (1.0 - confidence) * MAX_PIXEL_DIFF * f64::from(nw) * f64::from(nh);

    for y in 0..=(hh - nh) {
        for x in 0..=(hw - nw) {
            let mut acc = 0u64;
            let mut rejected = false;
            for &(sx, sy) in &samples {
                acc += pixel_diff(haystack, needle, x + sx, y + sy, sx, sy);
                if acc as f64 > budget {
                    rejected = true;
                    break;
                }
            }
            if rejected {
                continue;
            }
            let score = similarity_at(haystack, needle, x, y);
            if score >= confidence {
                return Some(Match {
                    x,
                    y,
                    width: nw,
                    height: nh,
                    score,
                });
            }
        }
    }
    None
}

/// Full similarity of `needle` placed at `(x, y)` in `haystack`.
///
/// Callers must ensure the needle fits at that position.
pub fn similarity_at(haystack: &RgbImage, needle: &RgbImage, x: u32, y: u32) -> f64 {
    let (nw, nh) = needle.dimensions();
    let mut total = 0u64;
    for ny in 0..nh {
        for nx in 0..nw {
            total += pixel_diff(haystack, needle, x + nx, y + ny, nx, ny);
        }
    }
    let max = MAX_PIXEL_DIFF * f64::from(nw) * f64::from(nh);
    1.0 - total as f64 / max
}

fn sample_points(nw: u32, nh: u32) -> Vec<(u32, u32)> {
    let step_x = (nw / SAMPLE_GRID).max(1);
    let step_y = (nh / SAMPLE_GRID).max(1);
    let mut out = Vec::new();
    let mut sy = 0;
    while sy < nh {
        let mut sx = 0;
        while sx < nw {
            out.push((sx, sy));
            sx += step_x;
        }
        sy += step_y;
    }
    out
}

fn pixel_diff(haystack: &RgbImage, needle: &RgbImage, hx: u32, hy: u32, nx: u32, ny: u32) -> u64 {
    let a = haystack.get_pixel(hx, hy).0;
    let b = needle.get_pixel(nx, ny).0;
    a.iter()
        .zip(b.iter())
        .map(|(&p, &q)| u64::from(p.abs_diff(q)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn patch() -> RgbImage {
        RgbImage::from_fn(5, 4, |x, y| Rgb([200, (x * 40) as u8, (y * 60) as u8 + 10]))
    }

    fn scene_with_patch_at(px: u32, py: u32) -> RgbImage {
        let p = patch();
        RgbImage::from_fn(40, 30, |x, y| {
            if x >= px && x < px + 5 && y >= py && y < py + 4 {
                *p.get_pixel(x - px, y - py)
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn finds_exact_patch() {
        let scene = scene_with_patch_at(12, 9);
        let found = locate(&scene, &patch(), 0.95).unwrap();
        assert_eq!((found.x, found.y), (12, 9));
        assert_eq!((found.width, found.height), (5, 4));
        assert!((found.score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exact_confidence_requires_identical_pixels() {
        let mut scene = scene_with_patch_at(3, 3);
        assert!(locate(&scene, &patch(), 1.0).is_some());
        scene.put_pixel(4, 4, Rgb([0, 0, 0]));
        assert!(locate(&scene, &patch(), 1.0).is_none());
        assert!(locate(&scene, &patch(), 0.9).is_some());
    }

    #[test]
    fn absent_patch_is_not_found() {
        let scene = RgbImage::from_pixel(40, 30, Rgb([0, 0, 0]));
        assert!(locate(&scene, &patch(), 0.8).is_none());
    }

    #[test]
    fn needle_larger_than_haystack() {
        let small = RgbImage::from_pixel(3, 3, Rgb([1, 2, 3]));
        assert!(locate(&small, &patch(), 0.5).is_none());
    }

    #[test]
    fn differences_on_sampled_pixels_alone_do_not_hide_a_match() {
        let needle = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 50]));
        let mut scene = needle.clone();
        // Every other pixel of the first row lies on the sample grid.
        for x in (0..16).step_by(2) {
            scene.put_pixel(x, 0, Rgb([255, 255, 255]));
        }
        let score = similarity_at(&scene, &needle, 0, 0);
        assert!(score >= 0.9 && score < 1.0);
        let found = locate(&scene, &needle, 0.9).unwrap();
        assert_eq!((found.x, found.y), (0, 0));
        assert_eq!(found.score, score);
    }

    #[test]
    fn similarity_is_monotonic_in_difference() {
        let needle = RgbImage::from_pixel(2, 2, Rgb([100, 100, 100]));
        let near = RgbImage::from_pixel(2, 2, Rgb([110, 100, 100]));
        let far = RgbImage::from_pixel(2, 2, Rgb([200, 100, 100]));
        assert!(similarity_at(&near, &needle, 0, 0) > similarity_at(&far, &needle, 0, 0));
    }
}
