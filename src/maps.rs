//! Map Registry - named image pyramids queried by style modules

use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CanvasError;
use crate::hashing::map_digest;
use crate::pyramid::ImagePyramid;
use crate::raster::decode_gray;

#[derive(Debug, Clone)]
struct MapEntry {
    pyramid: ImagePyramid,
    digest: Option<String>,
    source: Option<PathBuf>,
}

/// Registry of image pyramids, keyed by map name
#[derive(Debug, Default)]
pub struct MapRegistry {
    maps: HashMap<String, MapEntry>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self { maps: HashMap::new() }
    }

    /// Decode `path` as a grayscale image and register its pyramid under `name`.
    ///
    /// Any previous map with that name is only replaced once decoding and the
    /// pyramid build succeeded. Identical content and parameters reuse the
    /// registered pyramid.
    pub fn load(
        &mut self,
        path: &Path,
        name: &str,
        nb_levels: u32,
        sigma: f32,
        fit: Option<(u32, u32)>,
    ) -> Result<(), CanvasError> {
        let bytes = fs::read(path)
            .map_err(|e| CanvasError::Decode(format!("{}: {}", path.display(), e)))?;
        let digest = map_digest(&bytes, nb_levels, sigma, fit);

        if let Some(existing) = self.maps.get(name) {
            if existing.digest.as_deref() == Some(digest.as_str()) {
                debug!("map '{}' unchanged, keeping existing pyramid", name);
                return Ok(());
            }
        }

        let source = decode_gray(&bytes, fit).map_err(|e| match e {
            CanvasError::Decode(msg) => CanvasError::Decode(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        let pyramid = ImagePyramid::build(source, nb_levels, sigma)?;
        info!(
            "loaded map '{}' from {} ({} levels)",
            name,
            path.display(),
            pyramid.nb_levels()
        );

        self.maps.insert(
            name.to_string(),
            MapEntry {
                pyramid,
                digest: Some(digest),
                source: Some(path.to_path_buf()),
            },
        );
        Ok(())
    }

    /// Register an already built pyramid, replacing any map with that name.
    pub fn insert(&mut self, name: &str, pyramid: ImagePyramid) -> Option<ImagePyramid> {
        self.maps
            .insert(
                name.to_string(),
                MapEntry { pyramid, digest: None, source: None },
            )
            .map(|old| old.pyramid)
    }

    pub fn get(&self, name: &str) -> Option<&ImagePyramid> {
        self.maps.get(name).map(|e| &e.pyramid)
    }

    pub fn source_path(&self, name: &str) -> Option<&Path> {
        self.maps.get(name).and_then(|e| e.source.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ImagePyramid> {
        self.maps.remove(name).map(|e| e.pyramid)
    }

    /// Map names in lexicographic order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.maps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Value in [0, 1] of map `name` at level-0 coordinate (x, y), origin
    /// at the lower-left corner.
    pub fn read_pixel(&self, name: &str, level: usize, x: i32, y: i32) -> Result<f32, CanvasError> {
        let pyramid = self
            .get(name)
            .ok_or_else(|| CanvasError::ResourceNotFound(format!("map '{}'", name)))?;
        let value = pyramid.pixel_from_bottom(level, x, y)?;
        Ok(value.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GrayImage;
    use image::Luma;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32, value: u8) -> PathBuf {
        let path = dir.join(name);
        image::GrayImage::from_pixel(w, h, Luma([value])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_load_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "grey.png", 16, 16, 51);
        let mut maps = MapRegistry::new();
        maps.load(&path, "density", 2, 1.0, None).unwrap();

        assert_eq!(maps.names(), vec!["density"]);
        assert_eq!(maps.get("density").unwrap().nb_levels(), 3);
        let v = maps.read_pixel("density", 0, 3, 3).unwrap();
        assert!((v - 0.2).abs() < 1e-3);
        let v = maps.read_pixel("density", 2, 15, 0).unwrap();
        assert!((v - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_unknown_map() {
        let maps = MapRegistry::new();
        assert!(matches!(
            maps.read_pixel("nope", 0, 0, 0),
            Err(CanvasError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_failed_decode_keeps_previous_map() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_png(dir.path(), "good.png", 8, 8, 255);
        let bad = dir.path().join("bad.png");
        fs::write(&bad, b"garbage").unwrap();

        let mut maps = MapRegistry::new();
        maps.load(&good, "m", 1, 1.0, None).unwrap();
        assert!(matches!(maps.load(&bad, "m", 1, 1.0, None), Err(CanvasError::Decode(_))));
        assert!(matches!(
            maps.load(&dir.path().join("missing.png"), "m", 1, 1.0, None),
            Err(CanvasError::Decode(_))
        ));
        assert_eq!(maps.source_path("m"), Some(good.as_path()));
        assert_eq!(maps.read_pixel("m", 0, 0, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_reload_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let white = write_png(dir.path(), "white.png", 8, 8, 255);
        let black = write_png(dir.path(), "black.png", 8, 8, 0);

        let mut maps = MapRegistry::new();
        maps.load(&white, "m", 0, 1.0, None).unwrap();
        maps.load(&black, "m", 0, 1.0, None).unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps.read_pixel("m", 0, 1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_insert_prebuilt() {
        let mut maps = MapRegistry::new();
        let pyramid = ImagePyramid::build(GrayImage::new(4, 4), 1, 1.0).unwrap();
        assert!(maps.insert("flat", pyramid).is_none());
        assert!(maps.contains("flat"));
        assert!(maps.remove("flat").is_some());
        assert!(maps.is_empty());
    }
}
