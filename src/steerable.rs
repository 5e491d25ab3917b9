//! Steerable view map: orientation-filtered rasters of the view map.
//!
//! Holds one pyramid per orientation plus one for all orientations together
//! (the complete map), and the per-orientation weights of every feature edge
//! registered so far. Rebuilt by the host whenever the view map changes.

use log::debug;
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::error::CanvasError;
use crate::geometry::{FEdgeId, Vec2r};
use crate::pyramid::ImagePyramid;
use crate::raster::GrayImage;

#[derive(Debug, Clone)]
pub struct SteerableViewMap {
    nb_orientations: usize,
    /// cos(pi / nb_orientations): below this a direction gets no weight
    bound: f64,
    directions: Vec<Vec2r>,
    weights: HashMap<FEdgeId, Vec<f64>>,
    pyramids: Vec<ImagePyramid>,
}

impl Default for SteerableViewMap {
    fn default() -> Self {
        Self::new(crate::NB_STEERABLE_VIEWMAP - 1)
    }
}

impl SteerableViewMap {
    /// `nb_orientations` is clamped to at least 1.
    pub fn new(nb_orientations: usize) -> Self {
        let n = nb_orientations.max(1);
        let directions = (0..n)
            .map(|i| {
                let angle = i as f64 * PI / n as f64;
                Vec2r::new(angle.cos(), angle.sin())
            })
            .collect();
        Self {
            nb_orientations: n,
            bound: (PI / n as f64).cos(),
            directions,
            weights: HashMap::new(),
            pyramids: vec![],
        }
    }

    pub fn number_of_orientations(&self) -> usize {
        self.nb_orientations
    }

    /// Number of maps: one per orientation plus the complete map.
    pub fn number_of_maps(&self) -> usize {
        self.nb_orientations + 1
    }

    pub fn number_of_pyramid_levels(&self) -> Option<usize> {
        self.pyramids.first().map(ImagePyramid::nb_levels)
    }

    /// Weight of `dir` for orientation `i`, in [0, 1].
    pub fn compute_weight(&self, dir: Vec2r, i: usize) -> f64 {
        let Some(&axis) = self.directions.get(i) else {
            return 0.0;
        };
        let norm = dir.length();
        if norm < 1.0e-6 {
            return 0.0;
        }
        let dotp = (Vec2r::dot(dir, axis) / norm).abs().min(1.0);
        if dotp < self.bound {
            return 0.0;
        }
        (self.nb_orientations as f64 / 2.0 * dotp.acos()).cos()
    }

    /// Register a feature edge by its 2D direction, returning its weights.
    pub fn add_fedge(&mut self, id: FEdgeId, dir: Vec2r) -> &[f64] {
        let w: Vec<f64> = (0..self.nb_orientations)
            .map(|i| self.compute_weight(dir, i))
            .collect();
        self.weights.insert(id, w);
        &self.weights[&id]
    }

    pub fn fedge_weights(&self, id: FEdgeId) -> Option<&[f64]> {
        self.weights.get(&id).map(Vec::as_slice)
    }

    /// Orientation that best matches `dir`; `None` for a degenerate direction.
    pub fn svm_number(&self, dir: Vec2r) -> Option<usize> {
        best_index((0..self.nb_orientations).map(|i| self.compute_weight(dir, i)))
    }

    /// Orientation with the largest weight for a registered edge.
    pub fn svm_number_for_fedge(&self, id: FEdgeId) -> Option<usize> {
        self.weights
            .get(&id)
            .and_then(|w| best_index(w.iter().copied()))
    }

    /// Build one pyramid per map from `images` (orientations first, complete map last).
    pub fn build_images_pyramids(
        &mut self,
        images: Vec<GrayImage>,
        nb_levels: u32,
        sigma: f32,
    ) -> Result<(), CanvasError> {
        if images.len() != self.number_of_maps() {
            return Err(CanvasError::Configuration(format!(
                "steerable view map needs {} images, got {}",
                self.number_of_maps(),
                images.len()
            )));
        }
        let pyramids = images
            .into_iter()
            .map(|img| ImagePyramid::build(img, nb_levels, sigma))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "steerable view map: {} pyramids of {} levels",
            pyramids.len(),
            pyramids.first().map_or(0, ImagePyramid::nb_levels)
        );
        self.pyramids = pyramids;
        Ok(())
    }

    pub fn image_pyramid(&self, orientation: usize) -> Option<&ImagePyramid> {
        self.pyramids.get(orientation)
    }

    /// Value of orientation map `orientation` at level-0 coordinate (x, y),
    /// origin at the lower-left corner.
    pub fn read_steerable_view_map_pixel(
        &self,
        orientation: usize,
        level: usize,
        x: i32,
        y: i32,
    ) -> Result<f32, CanvasError> {
        if self.pyramids.is_empty() {
            return Err(CanvasError::ResourceNotFound(
                "steerable view map pyramids not built".to_string(),
            ));
        }
        let pyramid = self.pyramids.get(orientation).ok_or_else(|| {
            CanvasError::OutOfRange(format!(
                "orientation {} (have {})",
                orientation,
                self.pyramids.len()
            ))
        })?;
        pyramid.pixel_from_bottom(level, x, y)
    }

    pub fn read_complete_view_map_pixel(&self, level: usize, x: i32, y: i32) -> Result<f32, CanvasError> {
        self.read_steerable_view_map_pixel(self.nb_orientations, level, x, y)
    }

    /// Drop registered edges and pyramids.
    pub fn reset(&mut self) {
        self.weights.clear();
        self.pyramids.clear();
    }
}

fn best_index(weights: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best = None;
    let mut max = 0.0;
    for (i, w) in weights.enumerate() {
        if w > max {
            max = w;
            best = Some(i);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_five_maps() {
        let svm = SteerableViewMap::default();
        assert_eq!(svm.number_of_orientations(), 4);
        assert_eq!(svm.number_of_maps(), crate::NB_STEERABLE_VIEWMAP);
        assert_eq!(svm.number_of_pyramid_levels(), None);
    }

    #[test]
    fn test_axis_aligned_weights() {
        let svm = SteerableViewMap::default();
        let horizontal = Vec2r::new(3.0, 0.0);
        assert!((svm.compute_weight(horizontal, 0) - 1.0).abs() < 1e-9);
        assert_eq!(svm.compute_weight(horizontal, 2), 0.0);
        assert_eq!(svm.svm_number(horizontal), Some(0));
        assert_eq!(svm.svm_number(Vec2r::new(0.0, -1.0)), Some(2));
        assert_eq!(svm.svm_number(Vec2r::new(1.0, 1.0)), Some(1));
        assert_eq!(svm.svm_number(Vec2r::new(0.0, 0.0)), None);
    }

    #[test]
    fn test_fedge_registration() {
        let mut svm = SteerableViewMap::default();
        let w = svm.add_fedge(FEdgeId(7), Vec2r::new(-1.0, 1.0)).to_vec();
        assert_eq!(w.len(), 4);
        assert_eq!(svm.svm_number_for_fedge(FEdgeId(7)), Some(3));
        assert_eq!(svm.svm_number_for_fedge(FEdgeId(8)), None);
        svm.reset();
        assert!(svm.fedge_weights(FEdgeId(7)).is_none());
    }

    #[test]
    fn test_pyramids() {
        let mut svm = SteerableViewMap::default();
        assert!(svm.build_images_pyramids(vec![GrayImage::new(8, 8)], 2, 1.0).is_err());
        assert!(matches!(
            svm.read_complete_view_map_pixel(0, 0, 0),
            Err(CanvasError::ResourceNotFound(_))
        ));

        let images = (0..5)
            .map(|i| {
                let mut img = GrayImage::new(8, 8);
                img.fill(i as f32 / 4.0);
                img
            })
            .collect();
        svm.build_images_pyramids(images, 2, 1.0).unwrap();
        assert_eq!(svm.number_of_pyramid_levels(), Some(3));
        assert_eq!(svm.read_steerable_view_map_pixel(2, 0, 1, 1).unwrap(), 0.5);
        assert_eq!(svm.read_complete_view_map_pixel(0, 7, 7).unwrap(), 1.0);
        assert!(svm.read_steerable_view_map_pixel(5, 0, 0, 0).is_err());
    }
}
