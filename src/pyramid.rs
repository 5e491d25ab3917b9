//! Gaussian image pyramid.
//!
//! Level 0 is the source raster. Every further level is the previous one
//! smoothed and sampled at even coordinates. Queries are always expressed in
//! level-0 pixel coordinates.

use log::{debug, warn};

use crate::error::CanvasError;
use crate::filter::GaussianFilter;
use crate::raster::GrayImage;

#[derive(Debug, Clone)]
pub struct ImagePyramid {
    levels: Vec<GrayImage>,
    sigma: f32,
}

impl ImagePyramid {
    /// Build from `source`. `nb_levels` halved levels are added on top of it;
    /// 0 means keep halving while both dimensions allow it.
    pub fn build(source: GrayImage, nb_levels: u32, sigma: f32) -> Result<Self, CanvasError> {
        if source.is_empty() {
            return Err(CanvasError::Configuration(
                "cannot build a pyramid from an empty raster".to_string(),
            ));
        }
        let filter = GaussianFilter::new(sigma)?;
        let mut levels = vec![source];

        loop {
            if nb_levels != 0 && levels.len() > nb_levels as usize {
                break;
            }
            let Some(prev) = levels.last() else { break };
            match filter.downsample(prev) {
                Some(next) => {
                    debug!(
                        "pyramid level {}: {}x{}",
                        levels.len(),
                        next.width(),
                        next.height()
                    );
                    levels.push(next);
                }
                None => {
                    if nb_levels != 0 {
                        warn!(
                            "pyramid truncated at {} levels, {} requested",
                            levels.len() - 1,
                            nb_levels
                        );
                    }
                    break;
                }
            }
        }

        Ok(Self { levels, sigma })
    }

    /// Number of rasters, level 0 included.
    pub fn nb_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    pub fn level(&self, level: usize) -> Option<&GrayImage> {
        self.levels.get(level)
    }

    pub fn width(&self, level: usize) -> Option<u32> {
        self.level(level).map(GrayImage::width)
    }

    pub fn height(&self, level: usize) -> Option<u32> {
        self.level(level).map(GrayImage::height)
    }

    fn check_query(&self, level: usize, x: i32, y: i32) -> Result<(&GrayImage, u32, u32), CanvasError> {
        let img = self.levels.get(level).ok_or_else(|| {
            CanvasError::OutOfRange(format!(
                "level {} requested, pyramid has {}",
                level,
                self.levels.len()
            ))
        })?;
        let base = &self.levels[0];
        if x < 0 || y < 0 || x as u32 >= base.width() || y as u32 >= base.height() {
            return Err(CanvasError::OutOfRange(format!(
                "pixel ({}, {}) outside {}x{}",
                x,
                y,
                base.width(),
                base.height()
            )));
        }
        Ok((img, x as u32, y as u32))
    }

    /// Value at level-0 coordinate (x, y), row 0 at the top. Levels above 0
    /// are bilinearly interpolated between the containing cell and its
    /// right/lower neighbours.
    pub fn pixel(&self, level: usize, x: i32, y: i32) -> Result<f32, CanvasError> {
        let (img, x, y) = self.check_query(level, x, y)?;
        if level == 0 {
            return Ok(img.pixel(x, y));
        }

        let step = 1u32 << level;
        let (w, h) = (img.width(), img.height());
        let sx = (x >> level).min(w - 1);
        let sy = (y >> level).min(h - 1);

        // weights along each axis sum to `step`
        let a = (step * (sx + 1)) as f32 - x as f32;
        let b = x as f32 - (step * sx) as f32;
        let c = (step * (sy + 1)) as f32 - y as f32;
        let d = y as f32 - (step * sy) as f32;

        let row = |yy: u32| -> f32 {
            let mut p = a * img.pixel(sx, yy);
            if sx < w - 1 {
                if x % step != 0 {
                    p += b * img.pixel(sx + 1, yy);
                }
            } else {
                p += b * img.pixel(sx, yy);
            }
            p
        };

        let p1 = row(sy);
        let p2 = if sy < h - 1 {
            if y % step != 0 { row(sy + 1) } else { 0.0 }
        } else {
            p1
        };

        Ok((c * p1 + d * p2) / (step * step) as f32)
    }

    /// Same as [`pixel`](Self::pixel) with the origin at the lower-left corner.
    pub fn pixel_from_bottom(&self, level: usize, x: i32, y: i32) -> Result<f32, CanvasError> {
        let top = self.levels[0].height() as i32 - 1;
        let flipped = top.checked_sub(y).ok_or_else(|| {
            CanvasError::OutOfRange(format!("row {} outside 0..={}", y, top))
        })?;
        self.pixel(level, x, flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: u32, h: u32) -> GrayImage {
        let data = (0..h)
            .flat_map(|_| (0..w).map(move |x| x as f32 / (w - 1) as f32))
            .collect();
        GrayImage::from_raw(w, h, data).unwrap()
    }

    #[test]
    fn test_requested_levels() {
        let p = ImagePyramid::build(ramp(64, 32), 3, 1.0).unwrap();
        assert_eq!(p.nb_levels(), 4);
        assert_eq!(p.width(3), Some(8));
        assert_eq!(p.height(3), Some(4));
    }

    #[test]
    fn test_zero_levels_builds_full_pyramid() {
        let p = ImagePyramid::build(ramp(16, 8), 0, 1.0).unwrap();
        // 16x8, 8x4, 4x2, 2x1
        assert_eq!(p.nb_levels(), 4);
        assert_eq!(p.height(3), Some(1));
    }

    #[test]
    fn test_truncates_when_too_small() {
        let p = ImagePyramid::build(ramp(4, 4), 10, 1.0).unwrap();
        assert_eq!(p.nb_levels(), 3);
    }

    #[test]
    fn test_level_zero_is_exact() {
        let p = ImagePyramid::build(ramp(5, 3), 1, 1.0).unwrap();
        assert_eq!(p.pixel(0, 4, 1).unwrap(), 1.0);
        assert_eq!(p.pixel(0, 0, 2).unwrap(), 0.0);
    }

    #[test]
    fn test_upper_levels_stay_in_range() {
        let p = ImagePyramid::build(ramp(33, 17), 0, 1.0).unwrap();
        for level in 0..p.nb_levels() {
            for (x, y) in [(0, 0), (32, 16), (17, 9), (31, 1)] {
                let v = p.pixel(level, x, y).unwrap();
                assert!(v > -1e-5 && v < 1.0 + 1e-5, "level {} ({}, {}) = {}", level, x, y, v);
            }
        }
    }

    #[test]
    fn test_out_of_range_queries_fail() {
        let p = ImagePyramid::build(ramp(8, 8), 2, 1.0).unwrap();
        assert!(matches!(p.pixel(3, 0, 0), Err(CanvasError::OutOfRange(_))));
        assert!(matches!(p.pixel(0, 8, 0), Err(CanvasError::OutOfRange(_))));
        assert!(matches!(p.pixel(1, -1, 0), Err(CanvasError::OutOfRange(_))));
    }

    #[test]
    fn test_origin_flip() {
        let mut img = GrayImage::new(2, 3);
        img.set_pixel(0, 2, 1.0);
        let p = ImagePyramid::build(img, 1, 1.0).unwrap();
        assert_eq!(p.pixel_from_bottom(0, 0, 0).unwrap(), 1.0);
        assert_eq!(p.pixel_from_bottom(0, 0, 2).unwrap(), 0.0);
    }

    #[test]
    fn test_extreme_rows_fail_from_bottom() {
        let p = ImagePyramid::build(ramp(8, 8), 2, 1.0).unwrap();
        assert!(matches!(p.pixel_from_bottom(0, 0, i32::MIN), Err(CanvasError::OutOfRange(_))));
        assert!(matches!(p.pixel_from_bottom(1, 0, i32::MAX), Err(CanvasError::OutOfRange(_))));
        assert!(matches!(p.pixel_from_bottom(0, 0, -1), Err(CanvasError::OutOfRange(_))));
    }
}
