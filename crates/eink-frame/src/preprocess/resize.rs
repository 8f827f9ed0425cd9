//! Geometry: rotation, separable triangle-filter resampling, fit and fill.
//!
//! Pixels are handled as `[f32; 3]` sRGB code values (0.0..=255.0) so the
//! filter output can be rounded once at the end.

use super::options::{FitMode, Rotation};

pub(crate) type Rgbf = [f32; 3];

/// Rotate a row-major buffer clockwise. Returns the buffer and its new size.
pub(crate) fn rotate(
    pixels: &[Rgbf],
    width: usize,
    height: usize,
    rotation: Rotation,
) -> (Vec<Rgbf>, usize, usize) {
    match rotation {
        Rotation::None => (pixels.to_vec(), width, height),
        Rotation::Cw180 => {
            let mut out = pixels.to_vec();
            out.reverse();
            (out, width, height)
        }
        Rotation::Cw90 => {
            // Destination is height x width; its top row is the source's
            // left column read bottom to top.
            let mut out = Vec::with_capacity(pixels.len());
            for y in 0..width {
                for x in 0..height {
                    out.push(pixels[(height - 1 - x) * width + y]);
                }
            }
            (out, height, width)
        }
        Rotation::Cw270 => {
            let mut out = Vec::with_capacity(pixels.len());
            for y in 0..width {
                for x in 0..height {
                    out.push(pixels[x * width + (width - 1 - y)]);
                }
            }
            (out, height, width)
        }
    }
}

/// Contribution list for one output sample: `(source index, weight)`.
type Taps = Vec<(usize, f32)>;

/// Triangle filter weights mapping `src` samples onto `dst` samples.
///
/// Upscaling degenerates to bilinear interpolation; downscaling widens the
/// support by the scale factor so every source sample contributes.
fn triangle_taps(src: usize, dst: usize) -> Vec<Taps> {
    let scale = src as f32 / dst as f32;
    let support = scale.max(1.0);

    (0..dst)
        .map(|o| {
            let center = (o as f32 + 0.5) * scale - 0.5;
            let lo = (center - support).floor() as i64;
            let hi = (center + support).ceil() as i64;

            let mut taps: Taps = Vec::with_capacity((hi - lo + 1) as usize);
            let mut sum = 0.0;
            for i in lo..=hi {
                let w = 1.0 - ((i as f32 - center) / support).abs();
                if w <= 0.0 {
                    continue;
                }
                let idx = i.clamp(0, src as i64 - 1) as usize;
                match taps.last_mut() {
                    Some(last) if last.0 == idx => last.1 += w,
                    _ => taps.push((idx, w)),
                }
                sum += w;
            }
            for tap in &mut taps {
                tap.1 /= sum;
            }
            taps
        })
        .collect()
}

/// Resample to exactly `new_width x new_height`.
pub(crate) fn resize_triangle(
    pixels: &[Rgbf],
    width: usize,
    height: usize,
    new_width: usize,
    new_height: usize,
) -> Vec<Rgbf> {
    if width == new_width && height == new_height {
        return pixels.to_vec();
    }

    // Horizontal pass: width x height -> new_width x height
    let h_taps = triangle_taps(width, new_width);
    let mut horizontal = Vec::with_capacity(new_width * height);
    for y in 0..height {
        let row = &pixels[y * width..(y + 1) * width];
        for taps in &h_taps {
            horizontal.push(accumulate(taps.iter().map(|&(i, w)| (row[i], w))));
        }
    }

    // Vertical pass: new_width x height -> new_width x new_height
    let v_taps = triangle_taps(height, new_height);
    let mut out = Vec::with_capacity(new_width * new_height);
    for taps in &v_taps {
        for x in 0..new_width {
            out.push(accumulate(
                taps.iter().map(|&(i, w)| (horizontal[i * new_width + x], w)),
            ));
        }
    }
    out
}

#[inline]
fn accumulate(samples: impl Iterator<Item = (Rgbf, f32)>) -> Rgbf {
    let mut acc = [0.0f32; 3];
    for (px, w) in samples {
        for c in 0..3 {
            acc[c] += px[c] * w;
        }
    }
    acc
}

/// `round(a * b / c)` in integers.
#[inline]
fn mul_div_round(a: usize, b: usize, c: usize) -> usize {
    let (a, b, c) = (a as u64, b as u64, c as u64);
    ((2 * a * b + c) / (2 * c)) as usize
}

/// Size the source is scaled to before letterboxing.
pub(crate) fn fit_dimensions(
    width: usize,
    height: usize,
    target_width: usize,
    target_height: usize,
) -> (usize, usize) {
    // Compare aspect ratios without floats: w/h vs tw/th
    if width * target_height > target_width * height {
        let h = mul_div_round(target_width, height, width);
        (target_width, h.clamp(1, target_height))
    } else {
        let w = mul_div_round(target_height, width, height);
        (w.clamp(1, target_width), target_height)
    }
}

/// Centered region of the source, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Crop {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

/// Largest centered source region with the target's aspect ratio.
///
/// Cropping happens before resampling, so fill never materializes an image
/// larger than the source or the target.
pub(crate) fn fill_crop(
    width: usize,
    height: usize,
    target_width: usize,
    target_height: usize,
) -> Crop {
    let (cw, ch) = if width * target_height > target_width * height {
        let w = mul_div_round(height, target_width, target_height);
        (w.clamp(1, width), height)
    } else {
        let h = mul_div_round(width, target_height, target_width);
        (width, h.clamp(1, height))
    };
    Crop {
        left: (width - cw) / 2,
        top: (height - ch) / 2,
        width: cw,
        height: ch,
    }
}

/// Resize to exactly `target_width x target_height`, preserving aspect ratio.
pub(crate) fn fit_to_target(
    pixels: &[Rgbf],
    width: usize,
    height: usize,
    target_width: usize,
    target_height: usize,
    mode: FitMode,
    background: [u8; 3],
) -> Vec<Rgbf> {
    match mode {
        FitMode::Fit => {
            let (sw, sh) = fit_dimensions(width, height, target_width, target_height);
            let scaled = resize_triangle(pixels, width, height, sw, sh);

            let bg = background.map(f32::from);
            let mut canvas = vec![bg; target_width * target_height];
            let left = (target_width - sw) / 2;
            let top = (target_height - sh) / 2;
            for y in 0..sh {
                let dst = (top + y) * target_width + left;
                canvas[dst..dst + sw].copy_from_slice(&scaled[y * sw..(y + 1) * sw]);
            }
            canvas
        }
        FitMode::Fill => {
            let crop = fill_crop(width, height, target_width, target_height);
            let mut region = Vec::with_capacity(crop.width * crop.height);
            for y in crop.top..crop.top + crop.height {
                let src = y * width + crop.left;
                region.extend_from_slice(&pixels[src..src + crop.width]);
            }
            resize_triangle(
                &region,
                crop.width,
                crop.height,
                target_width,
                target_height,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: usize, height: usize) -> Vec<Rgbf> {
        (0..width * height).map(|i| [i as f32, 0.0, 0.0]).collect()
    }

    #[test]
    fn test_resize_noop_same_dimensions() {
        let input = grid(4, 3);
        assert_eq!(resize_triangle(&input, 4, 3, 4, 3), input);
    }

    #[test]
    fn test_resize_solid_stays_solid() {
        let input = vec![[200.0, 100.0, 50.0]; 37 * 23];
        for (w, h) in [(10, 10), (80, 50), (1, 1)] {
            let out = resize_triangle(&input, 37, 23, w, h);
            assert_eq!(out.len(), w * h);
            for px in out {
                assert!((px[0] - 200.0).abs() < 1e-3);
                assert!((px[1] - 100.0).abs() < 1e-3);
                assert!((px[2] - 50.0).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_downscale_averages() {
        // 2x1 -> 1x1 averages both samples
        let input = vec![[0.0, 0.0, 0.0], [255.0, 255.0, 255.0]];
        let out = resize_triangle(&input, 2, 1, 1, 1);
        assert!((out[0][0] - 127.5).abs() < 1e-3, "got {}", out[0][0]);
    }

    #[test]
    fn test_upscale_keeps_range() {
        let input = vec![[0.0, 0.0, 0.0], [255.0, 255.0, 255.0]];
        let out = resize_triangle(&input, 2, 1, 8, 1);
        assert_eq!(out.len(), 8);
        assert!(out.windows(2).all(|w| w[0][0] <= w[1][0]), "not monotonic");
        assert!(out.iter().all(|p| (0.0..=255.0).contains(&p[0])));
    }

    #[test]
    fn test_rotate_90_moves_top_left_to_top_right() {
        // 3x2 source:
        //   0 1 2
        //   3 4 5
        let (out, w, h) = rotate(&grid(3, 2), 3, 2, Rotation::Cw90);
        assert_eq!((w, h), (2, 3));
        let values: Vec<f32> = out.iter().map(|p| p[0]).collect();
        assert_eq!(values, vec![3.0, 0.0, 4.0, 1.0, 5.0, 2.0]);
    }

    #[test]
    fn test_rotate_270_is_inverse_of_90() {
        let input = grid(5, 3);
        let (cw, w, h) = rotate(&input, 5, 3, Rotation::Cw90);
        let (back, w, h) = rotate(&cw, w, h, Rotation::Cw270);
        assert_eq!((w, h), (5, 3));
        assert_eq!(back, input);
    }

    #[test]
    fn test_rotate_180() {
        let (out, w, h) = rotate(&grid(3, 2), 3, 2, Rotation::Cw180);
        assert_eq!((w, h), (3, 2));
        assert_eq!(out[0][0], 5.0);
        assert_eq!(out[5][0], 0.0);
    }

    #[test]
    fn test_fit_dimensions() {
        // 4:3 photo into 800x480 (5:3): height-bound
        assert_eq!(fit_dimensions(4000, 3000, 800, 480), (640, 480));
        // Panorama: width-bound
        assert_eq!(fit_dimensions(3000, 1000, 800, 480), (800, 267));
    }

    #[test]
    fn test_fit_dimensions_extreme_aspect_never_zero() {
        assert_eq!(fit_dimensions(10000, 1, 800, 480), (800, 1));
        assert_eq!(fit_dimensions(1, 10000, 800, 480), (1, 480));
    }

    #[test]
    fn test_fill_crop_is_centered_in_source() {
        // 4:3 into 5:3 keeps the full width, trims top and bottom
        assert_eq!(
            fill_crop(4000, 3000, 800, 480),
            Crop {
                left: 0,
                top: 300,
                width: 4000,
                height: 2400
            }
        );
        // 3:1 into 5:3 keeps the full height, trims the sides
        assert_eq!(
            fill_crop(3000, 1000, 800, 480),
            Crop {
                left: 666,
                top: 0,
                width: 1667,
                height: 1000
            }
        );
    }

    #[test]
    fn test_fill_crop_extreme_aspect_stays_within_source() {
        let crop = fill_crop(5000, 1, 800, 480);
        assert_eq!((crop.width, crop.height), (2, 1));
        assert_eq!(crop.left, 2499);

        let crop = fill_crop(1, 5000, 800, 480);
        assert_eq!((crop.width, crop.height), (1, 1));
        assert_eq!(crop.top, 2499);
    }

    #[test]
    fn test_fill_strip_resizes_only_the_crop() {
        // A 5000x1 strip: the center two samples fill the whole target
        let mut input = vec![[0.0; 3]; 5000];
        input[2499] = [90.0; 3];
        input[2500] = [90.0; 3];
        let out = fit_to_target(&input, 5000, 1, 800, 480, FitMode::Fill, [0, 0, 0]);
        assert_eq!(out.len(), 800 * 480);
        assert!(out.iter().all(|p| (p[0] - 90.0).abs() < 1e-3));
    }

    #[test]
    fn test_fit_letterboxes_with_background() {
        // Tall black source into a wide target: bars left and right
        let input = vec![[0.0; 3]; 2 * 4];
        let out = fit_to_target(&input, 2, 4, 8, 4, FitMode::Fit, [255, 255, 255]);
        assert_eq!(out.len(), 32);
        assert_eq!(out[0], [255.0; 3]);
        assert_eq!(out[7], [255.0; 3]);
        assert_eq!(out[3], [0.0; 3]);
        assert_eq!(out[4], [0.0; 3]);
    }

    #[test]
    fn test_fill_crops_center() {
        // 4x1 source into 2x1 target of the same height
        let input = vec![[10.0; 3], [20.0; 3], [30.0; 3], [40.0; 3]];
        let out = fit_to_target(&input, 4, 1, 2, 1, FitMode::Fill, [0, 0, 0]);
        assert_eq!(out, vec![[20.0; 3], [30.0; 3]]);
    }
}
