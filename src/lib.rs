//! Stroke Canvas - Style Module Pipeline Controller
//!
//! # Frame cycle
//! 1. Pre-draw resets per-frame backend state
//! 2. Visible style modules execute in chain order, one stroke layer each
//! 3. Layers are composited oldest first through a stroke renderer
//! 4. Post-draw tears the frame down
//!
//! Raster maps (image pyramids) and the steerable view map outlive frames
//! and are queried by style modules through their execution context.

pub mod error;
pub mod config;
pub mod geometry;
pub mod raster;
pub mod filter;
pub mod pyramid;
pub mod hashing;
pub mod maps;
pub mod steerable;
pub mod stroke;
pub mod style_module;
pub mod backend;
pub mod canvas;

pub use error::CanvasError;
pub use config::CanvasConfig;
pub use geometry::{BBox, FEdgeId, Vec2i, Vec2r, Vec3r};
pub use raster::GrayImage;
pub use pyramid::ImagePyramid;
pub use maps::MapRegistry;
pub use steerable::SteerableViewMap;
pub use stroke::{Stroke, StrokeLayer, StrokeRenderer, StrokeVertex};
pub use style_module::{ExecutionContext, StrokeShader, StyleModule};
pub use backend::{CanvasBackend, OffscreenBackend};
pub use canvas::{Canvas, FrameReport};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of maps held by a default steerable view map (4 orientations + complete map).
pub const NB_STEERABLE_VIEWMAP: usize = 5;
