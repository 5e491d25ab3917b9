//! Strokes, stroke layers and the renderer capability that consumes them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediumType {
    #[default]
    Dry,
    Humid,
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeVertex {
    /// Canvas pixel coordinates, origin at the lower-left corner
    pub x: f64,
    pub y: f64,
    /// Thickness on the right and left of the stroke
    pub thickness: [f32; 2],
    pub color: [f32; 3],
    pub alpha: f32,
}

impl StrokeVertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            thickness: [1.0, 1.0],
            color: [0.0, 0.0, 0.0],
            alpha: 1.0,
        }
    }

    pub fn with_color(mut self, color: [f32; 3], alpha: f32) -> Self {
        self.color = color;
        self.alpha = alpha;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: u64,
    #[serde(default)]
    pub medium: MediumType,
    pub vertices: Vec<StrokeVertex>,
}

impl Stroke {
    pub fn new(id: u64) -> Self {
        Self { id, medium: MediumType::default(), vertices: vec![] }
    }

    pub fn from_vertices(id: u64, vertices: Vec<StrokeVertex>) -> Self {
        Self { id, medium: MediumType::default(), vertices }
    }

    pub fn push_vertex(&mut self, vertex: StrokeVertex) {
        self.vertices.push(vertex);
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn scale_thickness(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v.thickness[0] *= factor;
            v.thickness[1] *= factor;
        }
    }
}

/// Consumer of strokes. Called once per stroke, layer by layer.
pub trait StrokeRenderer {
    fn render_stroke(&mut self, stroke: &Stroke);

    /// Reduced-fidelity path; defaults to the full one.
    fn render_stroke_basic(&mut self, stroke: &Stroke) {
        self.render_stroke(stroke);
    }
}

/// The strokes produced by one style module execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeLayer {
    strokes: Vec<Stroke>,
}

impl StrokeLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_strokes(strokes: Vec<Stroke>) -> Self {
        Self { strokes }
    }

    pub fn add_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn strokes_size(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn scale_thickness(&mut self, factor: f32) {
        self.strokes.iter_mut().for_each(|s| s.scale_thickness(factor));
    }

    pub fn render(&self, renderer: &mut dyn StrokeRenderer) {
        for stroke in &self.strokes {
            renderer.render_stroke(stroke);
        }
    }

    pub fn render_basic(&self, renderer: &mut dyn StrokeRenderer) {
        for stroke in &self.strokes {
            renderer.render_stroke_basic(stroke);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        full: Vec<u64>,
        basic: Vec<u64>,
    }

    impl StrokeRenderer for Recorder {
        fn render_stroke(&mut self, stroke: &Stroke) {
            self.full.push(stroke.id);
        }

        fn render_stroke_basic(&mut self, stroke: &Stroke) {
            self.basic.push(stroke.id);
        }
    }

    struct FullOnly(Vec<u64>);

    impl StrokeRenderer for FullOnly {
        fn render_stroke(&mut self, stroke: &Stroke) {
            self.0.push(stroke.id);
        }
    }

    fn layer(ids: &[u64]) -> StrokeLayer {
        StrokeLayer::from_strokes(ids.iter().map(|&id| Stroke::new(id)).collect())
    }

    #[test]
    fn test_render_paths_visit_in_order() {
        let l = layer(&[3, 1, 2]);
        let mut rec = Recorder::default();
        l.render(&mut rec);
        l.render_basic(&mut rec);
        assert_eq!(rec.full, vec![3, 1, 2]);
        assert_eq!(rec.basic, vec![3, 1, 2]);
    }

    #[test]
    fn test_basic_defaults_to_full() {
        let mut rec = FullOnly(vec![]);
        layer(&[5, 6]).render_basic(&mut rec);
        assert_eq!(rec.0, vec![5, 6]);
    }

    #[test]
    fn test_scale_thickness() {
        let mut l = StrokeLayer::new();
        l.add_stroke(Stroke::from_vertices(0, vec![StrokeVertex::new(0.0, 0.0)]));
        l.scale_thickness(2.5);
        assert_eq!(l.strokes()[0].vertices[0].thickness, [2.5, 2.5]);
        l.clear();
        assert!(l.is_empty());
    }

    #[test]
    fn test_layer_json_shape() {
        let l = layer(&[1]);
        let json = serde_json::to_value(&l).unwrap();
        assert_eq!(json["strokes"][0]["medium"], "dry");
        let back: StrokeLayer = serde_json::from_value(json).unwrap();
        assert_eq!(back, l);
    }
}
