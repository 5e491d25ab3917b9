//! Geometry handles shared with the view map side.
//!
//! The view map itself (view edges, feature edges) lives outside this crate;
//! the canvas only ever sees opaque edge ids and 2D directions.

use serde::{Deserialize, Serialize};
use vector2d::Vector2D;

/// 2D direction / point in canvas space.
pub type Vec2r = Vector2D<f64>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vec2i {
    pub x: i32,
    pub y: i32,
}

impl Vec2i {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3r {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3r {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Axis aligned box given by its min and max corners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox<T> {
    pub min: T,
    pub max: T,
}

impl<T> BBox<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl BBox<Vec2i> {
    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }
}

/// Opaque id of a feature edge of the view map. The canvas never owns edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FEdgeId(pub u64);
