use crate::capture::Frame;
use crate::error::PipelineError;

/// Separable Gaussian smoothing with a fixed odd kernel size.
///
/// Sigma is derived from the size; borders mirror without repeating the edge
/// pixel (`dcb|abcd|cba`).
#[derive(Debug, Clone)]
pub struct GaussianBlur {
    kernel: Vec<f32>,
}

impl GaussianBlur {
    pub fn new(size: usize) -> Result<Self, PipelineError> {
        if size == 0 || size % 2 == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "blur kernel size must be odd and positive, got {size}"
            )));
        }
        Ok(Self {
            kernel: gaussian_kernel(size),
        })
    }

    pub fn apply(&self, mut frame: Frame) -> Frame {
        let (width, height) = frame.dimensions();
        let (width, height) = (width as usize, height as usize);
        if width == 0 || height == 0 || self.kernel.len() == 1 {
            return frame;
        }

        let taps = self.kernel.len();
        let radius = taps / 2;

        // Horizontal pass into a float buffer so rounding happens once
        let src = frame.image.as_raw();
        let cols = border_table(width, radius);
        let mut tmp = vec![0f32; width * height * 3];
        for y in 0..height {
            let row = &src[y * width * 3..(y + 1) * width * 3];
            let out = &mut tmp[y * width * 3..(y + 1) * width * 3];
            for x in 0..width {
                let mut acc = [0f32; 3];
                for (weight, &sx) in self.kernel.iter().zip(&cols[x * taps..(x + 1) * taps]) {
                    let px = &row[sx * 3..sx * 3 + 3];
                    acc[0] += weight * px[0] as f32;
                    acc[1] += weight * px[1] as f32;
                    acc[2] += weight * px[2] as f32;
                }
                out[x * 3..x * 3 + 3].copy_from_slice(&acc);
            }
        }

        let rows = border_table(height, radius);
        let dst: &mut [u8] = &mut frame.image;
        for y in 0..height {
            let taps_y = &rows[y * taps..(y + 1) * taps];
            for x in 0..width {
                let mut acc = [0f32; 3];
                for (weight, &sy) in self.kernel.iter().zip(taps_y) {
                    let i = (sy * width + x) * 3;
                    acc[0] += weight * tmp[i];
                    acc[1] += weight * tmp[i + 1];
                    acc[2] += weight * tmp[i + 2];
                }
                let o = (y * width + x) * 3;
                for c in 0..3 {
                    dst[o + c] = acc[c].round().clamp(0.0, 255.0) as u8;
                }
            }
        }

        frame
    }
}

/// Normalized 1-D Gaussian weights.
///
/// Small sizes use the fixed binomial tables; larger ones compute sigma as
/// `0.3 * ((size - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    match size {
        1 => return vec![1.0],
        3 => return vec![0.25, 0.5, 0.25],
        5 => return vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => {
            return vec![
                0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
            ]
        }
        _ => {}
    }

    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size as f64 - 1.0) * 0.5;
    let scale = -0.5 / (sigma * sigma);

    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (scale * d * d).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Source index for every (position, tap) pair along one axis.
fn border_table(len: usize, radius: usize) -> Vec<usize> {
    let taps = 2 * radius + 1;
    let mut table = Vec::with_capacity(len * taps);
    for pos in 0..len {
        for k in 0..taps {
            table.push(reflect_101(pos as isize + k as isize - radius as isize, len));
        }
    }
    table
}

/// Mirror `i` into `0..len` excluding the edge sample.
fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let i = i.rem_euclid(period);
    if i < len as isize {
        i as usize
    } else {
        (period - i) as usize
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::capture::FrameMetadata;

    fn frame(image: RgbImage) -> Frame {
        Frame::new(image, FrameMetadata::default())
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(25);
        assert_eq!(kernel.len(), 25);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        for i in 0..12 {
            assert!((kernel[i] - kernel[24 - i]).abs() < 1e-7);
            assert!(kernel[i] < kernel[i + 1]);
        }
    }

    #[test]
    fn large_kernel_uses_derived_sigma() {
        // sigma = 0.3 * 11 + 0.8 = 4.1
        let kernel = gaussian_kernel(25);
        let ratio = kernel[13] / kernel[12];
        let expected = (-1.0f32 / (2.0 * 4.1 * 4.1)).exp();
        assert!((ratio - expected).abs() < 1e-5);
    }

    #[test]
    fn even_kernel_is_rejected() {
        assert!(GaussianBlur::new(24).is_err());
        assert!(GaussianBlur::new(0).is_err());
    }

    #[test]
    fn reflect_101_mirrors_without_edge() {
        let idx: Vec<usize> = (-3..7).map(|i| reflect_101(i, 4)).collect();
        assert_eq!(idx, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0]);
        assert_eq!(reflect_101(-12, 1), 0);
    }

    #[test]
    fn uniform_frame_is_unchanged() {
        let blur = GaussianBlur::new(25).unwrap();
        let out = blur.apply(frame(RgbImage::from_pixel(40, 30, Rgb([90, 180, 250]))));
        assert!(out.image.pixels().all(|p| *p == Rgb([90, 180, 250])));
    }

    #[test]
    fn impulse_spreads_symmetrically() {
        let mut image = RgbImage::new(31, 31);
        image.put_pixel(15, 15, Rgb([255, 255, 255]));

        let out = GaussianBlur::new(5).unwrap().apply(frame(image));
        let center = out.image.get_pixel(15, 15)[0];
        // 255 * 0.375^2
        assert_eq!(center, 36);
        assert_eq!(out.image.get_pixel(14, 15), out.image.get_pixel(16, 15));
        assert_eq!(out.image.get_pixel(15, 14), out.image.get_pixel(15, 16));
        assert_eq!(out.image.get_pixel(15, 12)[0], 0);
    }

    #[test]
    fn frames_smaller_than_kernel_are_handled() {
        let blur = GaussianBlur::new(25).unwrap();
        let out = blur.apply(frame(RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]))));
        assert_eq!(out.dimensions(), (3, 2));
        assert!(out.image.pixels().all(|p| *p == Rgb([10, 20, 30])));
    }
}
