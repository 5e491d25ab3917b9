//! Canvas Configuration - JSON, every field defaulted

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CanvasError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanvasConfig {
    /// Directories searched, in order, for map files given by relative path
    #[serde(default)]
    pub maps_path: Vec<PathBuf>,
    #[serde(default = "default_levels")]
    pub default_levels: u32,
    #[serde(default = "default_sigma")]
    pub default_sigma: f32,
    /// Resize decoded maps to the canvas size before building the pyramid
    #[serde(default = "default_true")]
    pub fit_maps_to_canvas: bool,
    #[serde(default)]
    pub basic: bool,
}

fn default_levels() -> u32 {
    4
}

fn default_sigma() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            maps_path: vec![],
            default_levels: default_levels(),
            default_sigma: default_sigma(),
            fit_maps_to_canvas: true,
            basic: false,
        }
    }
}

impl CanvasConfig {
    pub fn load(path: &Path) -> Result<Self, CanvasError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CanvasError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CanvasError> {
        let config: CanvasConfig = serde_json::from_str(content)?;
        if !(config.default_sigma > 0.0) {
            return Err(CanvasError::Configuration(format!(
                "defaultSigma must be positive, got {}",
                config.default_sigma
            )));
        }
        Ok(config)
    }

    /// Resolve a map file name: as given if it exists, else the first hit in `maps_path`.
    pub fn resolve_map_path(&self, file: &Path) -> PathBuf {
        if file.exists() || file.is_absolute() {
            return file.to_path_buf();
        }
        self.maps_path
            .iter()
            .map(|dir| dir.join(file))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| file.to_path_buf())
    }
}
