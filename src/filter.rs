//! Gaussian smoothing for pyramid construction

use rayon::prelude::*;

use crate::error::CanvasError;
use crate::raster::GrayImage;

/// Truncated Gaussian. Samples outside the image are dropped and the
/// remaining weights renormalised, so borders are not darkened.
#[derive(Debug, Clone)]
pub struct GaussianFilter {
    sigma: f32,
    /// Weights for offsets 0..=radius
    weights: Vec<f32>,
}

impl GaussianFilter {
    pub fn new(sigma: f32) -> Result<Self, CanvasError> {
        if !(sigma > 0.0) || !sigma.is_finite() {
            return Err(CanvasError::Configuration(format!(
                "gaussian sigma must be positive, got {}",
                sigma
            )));
        }
        let radius = Self::mask_size(sigma) / 2;
        let s2 = 2.0 * sigma * sigma;
        let weights = (0..=radius)
            .map(|d| {
                let d = d as f32;
                (-d * d / s2).exp()
            })
            .collect();
        Ok(Self { sigma, weights })
    }

    /// floor(4 sigma) + 1, bumped to the next odd number.
    pub fn mask_size(sigma: f32) -> usize {
        let size = (4.0 * sigma).floor() as usize + 1;
        if size % 2 == 0 { size + 1 } else { size }
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    pub fn radius(&self) -> usize {
        self.weights.len() - 1
    }

    pub fn smoothed_pixel(&self, img: &GrayImage, x: u32, y: u32) -> f32 {
        let r = self.radius() as i64;
        let (w, h) = (img.width() as i64, img.height() as i64);
        let (x, y) = (x as i64, y as i64);
        let mut acc = 0.0f32;
        let mut total = 0.0f32;
        for dy in -r..=r {
            let sy = y + dy;
            if sy < 0 || sy >= h {
                continue;
            }
            let wy = self.weights[dy.unsigned_abs() as usize];
            for dx in -r..=r {
                let sx = x + dx;
                if sx < 0 || sx >= w {
                    continue;
                }
                let weight = wy * self.weights[dx.unsigned_abs() as usize];
                acc += img.pixel(sx as u32, sy as u32) * weight;
                total += weight;
            }
        }
        if total > 0.0 { acc / total } else { 0.0 }
    }

    /// Half-resolution copy of `img`: smoothed samples taken at even
    /// coordinates. `None` when either dimension cannot be halved.
    pub fn downsample(&self, img: &GrayImage) -> Option<GrayImage> {
        let w = img.width() / 2;
        let h = img.height() / 2;
        if w == 0 || h == 0 {
            return None;
        }
        let mut out = GrayImage::new(w, h);
        out.as_raw_mut()
            .par_chunks_mut(w as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, v) in row.iter_mut().enumerate() {
                    *v = self.smoothed_pixel(img, 2 * x as u32, 2 * y as u32);
                }
            });
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_size_is_odd() {
        assert_eq!(GaussianFilter::mask_size(1.0), 5);
        assert_eq!(GaussianFilter::mask_size(0.5), 3);
        assert_eq!(GaussianFilter::mask_size(0.1), 1);
        assert_eq!(GaussianFilter::mask_size(2.0), 9);
    }

    #[test]
    fn test_rejects_bad_sigma() {
        assert!(GaussianFilter::new(0.0).is_err());
        assert!(GaussianFilter::new(-1.0).is_err());
        assert!(GaussianFilter::new(f32::NAN).is_err());
    }

    #[test]
    fn test_constant_image_stays_constant() {
        let mut img = GrayImage::new(7, 5);
        img.fill(0.6);
        let gf = GaussianFilter::new(1.0).unwrap();
        // corners renormalise over fewer samples
        assert!((gf.smoothed_pixel(&img, 0, 0) - 0.6).abs() < 1e-6);
        assert!((gf.smoothed_pixel(&img, 3, 2) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_downsample_halves() {
        let img = GrayImage::new(9, 4);
        let gf = GaussianFilter::new(1.0).unwrap();
        let half = gf.downsample(&img).unwrap();
        assert_eq!((half.width(), half.height()), (4, 2));
        assert!(gf.downsample(&GrayImage::new(1, 8)).is_none());
    }
}
