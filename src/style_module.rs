//! Style Modules - stroke programs plus their chain state
//!
//! A shader produces a stroke layer from the execution context.
//! The canvas owns modules and is the only one appending layers.

use std::fmt;

use crate::error::CanvasError;
use crate::geometry::{BBox, FEdgeId, Vec2i, Vec3r};
use crate::maps::MapRegistry;
use crate::pyramid::ImagePyramid;
use crate::steerable::SteerableViewMap;
use crate::stroke::StrokeLayer;

/// Stroke program trait - produces one layer per execution
pub trait StrokeShader {
    fn execute(&mut self, ctx: &ExecutionContext<'_>) -> Result<StrokeLayer, CanvasError>;
}

/// Adapter running a closure as a shader, see [`StyleModule::from_fn`].
pub struct FnShader<F>(F);

impl<F> StrokeShader for FnShader<F>
where
    F: FnMut(&ExecutionContext<'_>) -> Result<StrokeLayer, CanvasError>,
{
    fn execute(&mut self, ctx: &ExecutionContext<'_>) -> Result<StrokeLayer, CanvasError> {
        (self.0)(ctx)
    }
}

/// Read-only view of the canvas handed to a shader while it runs.
pub struct ExecutionContext<'a> {
    pub(crate) maps: &'a MapRegistry,
    pub(crate) steerable: Option<&'a SteerableViewMap>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) border: BBox<Vec2i>,
    pub(crate) scene_bbox: BBox<Vec3r>,
    pub(crate) selected_fedge: Option<FEdgeId>,
    pub(crate) module_index: usize,
    pub(crate) stroke_count: usize,
    pub(crate) timestamp: u64,
}

impl<'a> ExecutionContext<'a> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn border(&self) -> BBox<Vec2i> {
        self.border
    }

    pub fn scene_3d_bbox(&self) -> BBox<Vec3r> {
        self.scene_bbox
    }

    pub fn selected_fedge(&self) -> Option<FEdgeId> {
        self.selected_fedge
    }

    /// Position of the executing module in the chain
    pub fn current_module(&self) -> usize {
        self.module_index
    }

    /// Strokes produced by earlier modules in this frame
    pub fn stroke_count(&self) -> usize {
        self.stroke_count
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn map(&self, name: &str) -> Option<&'a ImagePyramid> {
        self.maps.get(name)
    }

    pub fn read_map_pixel(&self, name: &str, level: usize, x: i32, y: i32) -> Result<f32, CanvasError> {
        self.maps.read_pixel(name, level, x, y)
    }

    pub fn steerable_view_map(&self) -> Result<&'a SteerableViewMap, CanvasError> {
        self.steerable
            .ok_or_else(|| CanvasError::ResourceNotFound("steerable view map".to_string()))
    }
}

pub struct StyleModule {
    name: String,
    shader: Box<dyn StrokeShader>,
    modified: bool,
    displayed: bool,
}

impl StyleModule {
    /// New modules are visible and modified, so they run on the next draw.
    pub fn new(name: impl Into<String>, shader: impl StrokeShader + 'static) -> Self {
        Self {
            name: name.into(),
            shader: Box::new(shader),
            modified: true,
            displayed: true,
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&ExecutionContext<'_>) -> Result<StrokeLayer, CanvasError> + 'static,
    {
        Self::new(name, FnShader(f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    pub fn set_displayed(&mut self, displayed: bool) {
        self.displayed = displayed;
    }

    pub fn execute(&mut self, ctx: &ExecutionContext<'_>) -> Result<StrokeLayer, CanvasError> {
        self.shader.execute(ctx)
    }
}

impl fmt::Debug for StyleModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleModule")
            .field("name", &self.name)
            .field("modified", &self.modified)
            .field("displayed", &self.displayed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::Stroke;

    fn context(maps: &MapRegistry) -> ExecutionContext<'_> {
        ExecutionContext {
            maps,
            steerable: None,
            width: 32,
            height: 16,
            border: BBox::new(Vec2i::new(0, 0), Vec2i::new(32, 16)),
            scene_bbox: BBox::default(),
            selected_fedge: None,
            module_index: 2,
            stroke_count: 5,
            timestamp: 9,
        }
    }

    #[test]
    fn test_new_module_is_dirty_and_visible() {
        let m = StyleModule::from_fn("contours", |_| Ok(StrokeLayer::new()));
        assert_eq!(m.name(), "contours");
        assert!(m.is_modified());
        assert!(m.is_displayed());
    }

    #[test]
    fn test_closure_shader_sees_context() {
        let maps = MapRegistry::new();
        let ctx = context(&maps);
        let mut m = StyleModule::from_fn("sized", |ctx| {
            let mut layer = StrokeLayer::new();
            layer.add_stroke(Stroke::new(ctx.width() as u64 * 100 + ctx.current_module() as u64));
            Ok(layer)
        });
        let layer = m.execute(&ctx).unwrap();
        assert_eq!(layer.strokes()[0].id, 3202);
    }

    #[test]
    fn test_missing_resources_are_reported() {
        let maps = MapRegistry::new();
        let ctx = context(&maps);
        assert!(matches!(ctx.steerable_view_map(), Err(CanvasError::ResourceNotFound(_))));
        assert!(matches!(ctx.read_map_pixel("paper", 0, 0, 0), Err(CanvasError::ResourceNotFound(_))));
        assert!(ctx.map("paper").is_none());
    }

    #[test]
    fn test_debug_shows_state() {
        let mut m = StyleModule::from_fn("x", |_| Ok(StrokeLayer::new()));
        m.set_displayed(false);
        let s = format!("{:?}", m);
        assert!(s.contains("displayed: false"));
    }
}
