//! Scalar rasters and grayscale decoding.

use image::imageops::FilterType;

use crate::error::CanvasError;

/// Row-major scalar raster, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl GrayImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Result<Self, CanvasError> {
        if data.len() != width as usize * height as usize {
            return Err(CanvasError::Configuration(format!(
                "raster {}x{} needs {} samples, got {}",
                width,
                height,
                width as usize * height as usize,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Convert an 8-bit luma image, mapping 0..=255 onto 0.0..=1.0.
    pub fn from_luma8(img: &image::GrayImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().iter().map(|&v| v as f32 / 255.0).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Unchecked in release builds; callers stay within `width`/`height`.
    pub fn pixel(&self, x: u32, y: u32) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.pixel(x, y))
        } else {
            None
        }
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, value: f32) {
        debug_assert!(x < self.width && y < self.height);
        self.data[y as usize * self.width as usize + x as usize] = value;
    }

    pub fn fill(&mut self, value: f32) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    pub fn as_raw(&self) -> &[f32] {
        &self.data
    }

    pub fn as_raw_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// Decode an encoded image to a grayscale raster, optionally resized
/// (aspect ratio not preserved) to `fit`.
pub fn decode_gray(bytes: &[u8], fit: Option<(u32, u32)>) -> Result<GrayImage, CanvasError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| CanvasError::Decode(e.to_string()))?;
    let decoded = match fit {
        Some((w, h)) if w > 0 && h > 0 && (w, h) != (decoded.width(), decoded.height()) => {
            decoded.resize_exact(w, h, FilterType::Triangle)
        }
        _ => decoded,
    };
    let luma = decoded.to_luma8();
    if luma.width() == 0 || luma.height() == 0 {
        return Err(CanvasError::Decode("image has no pixels".to_string()));
    }
    Ok(GrayImage::from_luma8(&luma))
}
