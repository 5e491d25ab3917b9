//! Canvas backends.
//!
//! The canvas controller only talks to a [`CanvasBackend`]; the backend
//! owns the render target and turns strokes into pixels.

use image::{Rgb, Rgb32FImage};
use log::debug;

use crate::error::CanvasError;
use crate::geometry::{BBox, Vec2i, Vec3r};
use crate::raster::GrayImage;
use crate::stroke::{Stroke, StrokeRenderer};

pub trait CanvasBackend: StrokeRenderer {
    /// Allocate the render target. Called once before the first draw.
    fn init(&mut self) -> Result<(), CanvasError>;

    /// Reset per-frame backend state.
    fn pre_draw(&mut self) {}

    fn post_draw(&mut self) {}

    /// Present the current frame.
    fn update(&mut self) {}

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Drawable region in pixel space
    fn border(&self) -> BBox<Vec2i>;

    fn scene_3d_bbox(&self) -> BBox<Vec3r>;

    /// Color of the region with lower-left corner (x, y), top row first.
    fn read_color_pixels(&self, x: u32, y: u32, w: u32, h: u32) -> Result<Rgb32FImage, CanvasError>;

    /// Depth of the region with lower-left corner (x, y), top row first.
    fn read_depth_pixels(&self, x: u32, y: u32, w: u32, h: u32) -> Result<GrayImage, CanvasError>;

    fn record_flag(&self) -> bool {
        false
    }
}

/// CPU render target: float RGB color plus depth, origin at the lower-left.
/// Strokes are splatted vertex by vertex.
#[derive(Debug, Clone)]
pub struct OffscreenBackend {
    width: u32,
    height: u32,
    background: [f32; 3],
    scene_bbox: BBox<Vec3r>,
    color: Option<Rgb32FImage>,
    depth: Option<GrayImage>,
    frames_presented: u64,
}

impl OffscreenBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: [1.0, 1.0, 1.0],
            scene_bbox: BBox::default(),
            color: None,
            depth: None,
            frames_presented: 0,
        }
    }

    pub fn with_background(mut self, background: [f32; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn set_scene_3d_bbox(&mut self, bbox: BBox<Vec3r>) {
        self.scene_bbox = bbox;
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn clear(&mut self) {
        let bg = Rgb(self.background);
        if let Some(color) = self.color.as_mut() {
            color.pixels_mut().for_each(|p| *p = bg);
        }
        if let Some(depth) = self.depth.as_mut() {
            depth.fill(1.0);
        }
    }

    /// Buffer row and column of canvas pixel (x, y), if inside.
    fn locate(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        let (px, py) = (x.floor(), y.floor());
        if px < 0.0 || py < 0.0 || px >= self.width as f64 || py >= self.height as f64 {
            return None;
        }
        Some((px as u32, self.height - 1 - py as u32))
    }

    fn splat(&mut self, stroke: &Stroke, flat: Option<[f32; 3]>) {
        let targets: Vec<(u32, u32, [f32; 3], f32)> = stroke
            .vertices
            .iter()
            .filter_map(|v| {
                let (col, row) = self.locate(v.x, v.y)?;
                Some(match flat {
                    Some(c) => (col, row, c, 1.0),
                    None => (col, row, v.color, v.alpha.clamp(0.0, 1.0)),
                })
            })
            .collect();
        let (Some(color), Some(depth)) = (self.color.as_mut(), self.depth.as_mut()) else {
            return;
        };
        for (col, row, c, alpha) in targets {
            let px = color.get_pixel_mut(col, row);
            for k in 0..3 {
                px.0[k] = px.0[k] * (1.0 - alpha) + c[k] * alpha;
            }
            depth.set_pixel(col, row, 0.0);
        }
    }

    fn check_region(&self, x: u32, y: u32, w: u32, h: u32) -> Result<(), CanvasError> {
        if self.color.is_none() {
            return Err(CanvasError::Configuration("backend not initialized".to_string()));
        }
        let fits = x.checked_add(w).map_or(false, |r| r <= self.width)
            && y.checked_add(h).map_or(false, |t| t <= self.height);
        if !fits {
            return Err(CanvasError::OutOfRange(format!(
                "region {}x{} at ({}, {}) outside {}x{} canvas",
                w, h, x, y, self.width, self.height
            )));
        }
        Ok(())
    }
}

impl StrokeRenderer for OffscreenBackend {
    fn render_stroke(&mut self, stroke: &Stroke) {
        self.splat(stroke, None);
    }

    fn render_stroke_basic(&mut self, stroke: &Stroke) {
        let flat = stroke.vertices.first().map_or([0.0; 3], |v| v.color);
        self.splat(stroke, Some(flat));
    }
}

impl CanvasBackend for OffscreenBackend {
    fn init(&mut self) -> Result<(), CanvasError> {
        if self.width == 0 || self.height == 0 {
            return Err(CanvasError::Configuration(format!(
                "cannot allocate a {}x{} render target",
                self.width, self.height
            )));
        }
        debug!("offscreen target {}x{}", self.width, self.height);
        self.color = Some(Rgb32FImage::new(self.width, self.height));
        self.depth = Some(GrayImage::new(self.width, self.height));
        self.clear();
        Ok(())
    }

    fn pre_draw(&mut self) {
        self.clear();
    }

    fn update(&mut self) {
        self.frames_presented += 1;
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn border(&self) -> BBox<Vec2i> {
        BBox::new(
            Vec2i::new(0, 0),
            Vec2i::new(self.width as i32, self.height as i32),
        )
    }

    fn scene_3d_bbox(&self) -> BBox<Vec3r> {
        self.scene_bbox
    }

    fn read_color_pixels(&self, x: u32, y: u32, w: u32, h: u32) -> Result<Rgb32FImage, CanvasError> {
        self.check_region(x, y, w, h)?;
        let mut out = Rgb32FImage::new(w, h);
        if let Some(color) = self.color.as_ref() {
            let top = self.height - (y + h);
            for r in 0..h {
                for c in 0..w {
                    out.put_pixel(c, r, *color.get_pixel(x + c, top + r));
                }
            }
        }
        Ok(out)
    }

    fn read_depth_pixels(&self, x: u32, y: u32, w: u32, h: u32) -> Result<GrayImage, CanvasError> {
        self.check_region(x, y, w, h)?;
        let mut out = GrayImage::new(w, h);
        if let Some(depth) = self.depth.as_ref() {
            let top = self.height - (y + h);
            for r in 0..h {
                for c in 0..w {
                    out.set_pixel(c, r, depth.pixel(x + c, top + r));
                }
            }
        }
        Ok(out)
    }
}
