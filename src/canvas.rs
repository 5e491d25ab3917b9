//! Canvas - the style module pipeline controller
//!
//! Owns the module chain, the stroke layer stack, the map registry and the
//! steerable view map. One canvas per host; the host hands it out by
//! reference instead of reaching for a global.

use log::{debug, info, warn};
use std::path::Path;

use image::Rgb32FImage;

use crate::backend::CanvasBackend;
use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::geometry::{BBox, FEdgeId, Vec2i, Vec3r};
use crate::maps::MapRegistry;
use crate::pyramid::ImagePyramid;
use crate::raster::GrayImage;
use crate::steerable::SteerableViewMap;
use crate::stroke::{Stroke, StrokeLayer, StrokeRenderer};
use crate::style_module::{ExecutionContext, StyleModule};

/// Outcome of one [`Canvas::draw`] cycle
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Modules that produced a layer, in chain order
    pub executed: Vec<usize>,
    /// Invisible modules
    pub skipped: Vec<usize>,
    pub failures: Vec<(usize, CanvasError)>,
    pub layers_appended: usize,
    pub strokes_rendered: usize,
}

impl FrameReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Canvas<B: CanvasBackend> {
    backend: B,
    config: CanvasConfig,
    layers: Vec<StrokeLayer>,
    modules: Vec<StyleModule>,
    current_module: Option<usize>,
    maps: MapRegistry,
    steerable: Option<SteerableViewMap>,
    selected_fedge: Option<FEdgeId>,
    stroke_count: usize,
    timestamp: u64,
    basic: bool,
    initialized: bool,
}

impl<B: CanvasBackend> Canvas<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, CanvasConfig::default())
    }

    pub fn with_config(backend: B, config: CanvasConfig) -> Self {
        Self {
            backend,
            basic: config.basic,
            config,
            layers: vec![],
            modules: vec![],
            current_module: None,
            maps: MapRegistry::new(),
            steerable: None,
            selected_fedge: None,
            stroke_count: 0,
            timestamp: 0,
            initialized: false,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    // --- Frame cycle ---

    /// Backend setup. Must succeed once before [`draw`](Self::draw).
    pub fn init(&mut self) -> Result<(), CanvasError> {
        self.backend.init()?;
        self.initialized = true;
        Ok(())
    }

    /// Start a frame: the previous frame's layers are dropped and the
    /// stroke counter restarts at zero.
    pub fn pre_draw(&mut self) {
        self.erase();
        self.backend.pre_draw();
    }

    pub fn post_draw(&mut self) {
        self.backend.post_draw();
    }

    /// Run every visible module in chain order, collect the layers they
    /// produce, then composite them through the backend. Each draw replaces
    /// the previous frame.
    ///
    /// A failing module contributes nothing and stays modified; the
    /// following modules still run. Failures are returned in the report.
    pub fn draw(&mut self) -> Result<FrameReport, CanvasError> {
        if !self.initialized {
            return Err(CanvasError::Configuration(
                "canvas must be initialized before drawing".to_string(),
            ));
        }

        let mut report = FrameReport::default();
        self.pre_draw();

        for index in 0..self.modules.len() {
            if !self.modules[index].is_displayed() {
                report.skipped.push(index);
                continue;
            }
            self.current_module = Some(index);

            let ctx = ExecutionContext {
                maps: &self.maps,
                steerable: self.steerable.as_ref(),
                width: self.backend.width(),
                height: self.backend.height(),
                border: self.backend.border(),
                scene_bbox: self.backend.scene_3d_bbox(),
                selected_fedge: self.selected_fedge,
                module_index: index,
                stroke_count: self.stroke_count,
                timestamp: self.timestamp,
            };
            let module = &mut self.modules[index];

            match module.execute(&ctx) {
                Ok(layer) => {
                    debug!(
                        "module {} '{}' produced {} strokes",
                        index,
                        module.name(),
                        layer.strokes_size()
                    );
                    module.set_modified(false);
                    self.stroke_count += layer.strokes_size();
                    self.layers.push(layer);
                    self.timestamp += 1;
                    report.executed.push(index);
                    report.layers_appended += 1;
                }
                Err(e) => {
                    warn!("module {} '{}' failed: {}", index, module.name(), e);
                    let err = match e {
                        CanvasError::ExecutionFailure(msg) => CanvasError::ExecutionFailure(
                            format!("module {} '{}': {}", index, module.name(), msg),
                        ),
                        other => CanvasError::ExecutionFailure(format!(
                            "module {} '{}': {}",
                            index,
                            module.name(),
                            other
                        )),
                    };
                    report.failures.push((index, err));
                }
            }
        }

        report.strokes_rendered = self.composite();
        self.post_draw();

        info!(
            "frame: {} modules executed, {} failed, {} strokes rendered",
            report.executed.len(),
            report.failures.len(),
            report.strokes_rendered
        );
        Ok(report)
    }

    /// Render every layer through the backend, oldest first.
    fn composite(&mut self) -> usize {
        let mut count = 0;
        for layer in &self.layers {
            if self.basic {
                layer.render_basic(&mut self.backend);
            } else {
                layer.render(&mut self.backend);
            }
            count += layer.strokes_size();
        }
        count
    }

    /// Render every layer through `renderer`, oldest first.
    pub fn render(&self, renderer: &mut dyn StrokeRenderer) {
        for layer in &self.layers {
            layer.render(renderer);
        }
    }

    /// Same order as [`render`](Self::render), reduced-fidelity stroke path.
    pub fn render_basic(&self, renderer: &mut dyn StrokeRenderer) {
        for layer in &self.layers {
            layer.render_basic(renderer);
        }
    }

    pub fn render_stroke(&mut self, stroke: &Stroke) {
        self.backend.render_stroke(stroke);
    }

    pub fn update(&mut self) {
        self.backend.update();
    }

    /// Drop all layers and reset the stroke counter.
    pub fn erase(&mut self) {
        self.layers.clear();
        self.stroke_count = 0;
    }

    /// [`erase`](Self::erase), plus every module marked unmodified and the
    /// current module forgotten. Maps and the steerable view map survive.
    pub fn clear(&mut self) {
        self.erase();
        self.reset_modified(false);
        self.current_module = None;
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    // --- Layers ---

    pub fn add_layer(&mut self, layer: StrokeLayer) {
        self.stroke_count += layer.strokes_size();
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[StrokeLayer] {
        &self.layers
    }

    pub fn stroke_count(&self) -> usize {
        self.stroke_count
    }

    /// Successful module executions since creation
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn is_basic(&self) -> bool {
        self.basic
    }

    pub fn set_basic(&mut self, basic: bool) {
        self.basic = basic;
    }

    // --- Module chain ---

    pub fn style_modules(&self) -> &[StyleModule] {
        &self.modules
    }

    pub fn style_module(&self, index: usize) -> Option<&StyleModule> {
        self.modules.get(index)
    }

    pub fn nb_style_modules(&self) -> usize {
        self.modules.len()
    }

    /// Last module run by [`draw`](Self::draw), until the chain changes.
    pub fn current_style_module(&self) -> Option<&StyleModule> {
        self.current_module.and_then(|i| self.modules.get(i))
    }

    fn check_index(&self, index: usize) -> Result<(), CanvasError> {
        if index < self.modules.len() {
            Ok(())
        } else {
            let err = CanvasError::bad_index("style module", index, self.modules.len());
            warn!("{}", err);
            Err(err)
        }
    }

    pub fn push_back_style_module(&mut self, module: StyleModule) {
        debug!("push style module '{}' at {}", module.name(), self.modules.len());
        self.modules.push(module);
        self.current_module = None;
    }

    /// Insert `module` directly after position `index`.
    pub fn insert_style_module(&mut self, index: usize, module: StyleModule) -> Result<(), CanvasError> {
        self.check_index(index)?;
        debug!("insert style module '{}' at {}", module.name(), index + 1);
        self.modules.insert(index + 1, module);
        self.current_module = None;
        Ok(())
    }

    /// Remove the module at `index`, handing it back to the caller.
    pub fn remove_style_module(&mut self, index: usize) -> Result<StyleModule, CanvasError> {
        self.check_index(index)?;
        let module = self.modules.remove(index);
        debug!("removed style module '{}' from {}", module.name(), index);
        self.current_module = None;
        Ok(module)
    }

    pub fn swap_style_modules(&mut self, i1: usize, i2: usize) -> Result<(), CanvasError> {
        self.check_index(i1)?;
        self.check_index(i2)?;
        self.modules.swap(i1, i2);
        self.current_module = None;
        Ok(())
    }

    /// Replace the module at `index`, returning the old one.
    pub fn replace_style_module(&mut self, index: usize, module: StyleModule) -> Result<StyleModule, CanvasError> {
        self.check_index(index)?;
        let old = std::mem::replace(&mut self.modules[index], module);
        debug!("replaced style module '{}' at {}", old.name(), index);
        self.current_module = None;
        Ok(old)
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<(), CanvasError> {
        self.check_index(index)?;
        self.modules[index].set_displayed(visible);
        Ok(())
    }

    pub fn set_modified(&mut self, index: usize, modified: bool) -> Result<(), CanvasError> {
        self.check_index(index)?;
        self.modules[index].set_modified(modified);
        Ok(())
    }

    pub fn reset_modified(&mut self, modified: bool) {
        for module in &mut self.modules {
            module.set_modified(modified);
        }
    }

    /// Append to `out` the positions >= `index` of modified modules, ascending.
    pub fn causal_style_modules(&self, out: &mut Vec<usize>, index: usize) {
        out.extend(
            self.modules
                .iter()
                .enumerate()
                .skip(index)
                .filter(|(_, m)| m.is_modified())
                .map(|(i, _)| i),
        );
    }

    // --- Maps ---

    /// Load a grayscale map, build its pyramid and register it as `name`.
    ///
    /// `path` is looked up in the configured maps path when it does not
    /// exist as given. With `fit_maps_to_canvas`, the image is first
    /// resized to the canvas size.
    pub fn load_map(&mut self, path: impl AsRef<Path>, name: &str, nb_levels: u32, sigma: f32) -> Result<(), CanvasError> {
        let resolved = self.config.resolve_map_path(path.as_ref());
        let fit = if self.config.fit_maps_to_canvas {
            Some((self.backend.width(), self.backend.height()))
        } else {
            None
        };
        self.maps.load(&resolved, name, nb_levels, sigma, fit)
    }

    /// [`load_map`](Self::load_map) with the configured levels and sigma.
    pub fn load_map_default(&mut self, path: impl AsRef<Path>, name: &str) -> Result<(), CanvasError> {
        let (levels, sigma) = (self.config.default_levels, self.config.default_sigma);
        self.load_map(path, name, levels, sigma)
    }

    /// Value in [0, 1]; (x, y) in level-0 coordinates, origin lower-left.
    pub fn read_map_pixel(&self, name: &str, level: usize, x: i32, y: i32) -> Result<f32, CanvasError> {
        self.maps.read_pixel(name, level, x, y)
    }

    pub fn map(&self, name: &str) -> Option<&ImagePyramid> {
        self.maps.get(name)
    }

    pub fn maps(&self) -> &MapRegistry {
        &self.maps
    }

    pub fn remove_map(&mut self, name: &str) -> Option<ImagePyramid> {
        self.maps.remove(name)
    }

    // --- Steerable view map ---

    /// Install a steerable view map, returning the previous one.
    pub fn load_steerable_view_map(&mut self, svm: SteerableViewMap) -> Option<SteerableViewMap> {
        self.steerable.replace(svm)
    }

    pub fn steerable_view_map(&self) -> Option<&SteerableViewMap> {
        self.steerable.as_ref()
    }

    pub fn steerable_view_map_mut(&mut self) -> Option<&mut SteerableViewMap> {
        self.steerable.as_mut()
    }

    // --- Selection and backend access ---

    pub fn selected_fedge(&self) -> Option<FEdgeId> {
        self.selected_fedge
    }

    pub fn set_selected_fedge(&mut self, fedge: Option<FEdgeId>) {
        self.selected_fedge = fedge;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn width(&self) -> u32 {
        self.backend.width()
    }

    pub fn height(&self) -> u32 {
        self.backend.height()
    }

    pub fn border(&self) -> BBox<Vec2i> {
        self.backend.border()
    }

    pub fn scene_3d_bbox(&self) -> BBox<Vec3r> {
        self.backend.scene_3d_bbox()
    }

    pub fn record_flag(&self) -> bool {
        self.backend.record_flag()
    }

    pub fn read_color_pixels(&self, x: u32, y: u32, w: u32, h: u32) -> Result<Rgb32FImage, CanvasError> {
        self.backend.read_color_pixels(x, y, w, h)
    }

    pub fn read_depth_pixels(&self, x: u32, y: u32, w: u32, h: u32) -> Result<GrayImage, CanvasError> {
        self.backend.read_depth_pixels(x, y, w, h)
    }
}
