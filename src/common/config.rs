//! Build configuration loading.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::topology::recorder::DEFAULT_REGION_TAG;
use crate::topology::{BuildSettings, DEFAULT_AREA_M2};

fn default_area_m2() -> f64 {
    DEFAULT_AREA_M2
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dataset")
}

fn default_region_tag() -> String {
    DEFAULT_REGION_TAG.to_string()
}

/// Clustering and output settings for a build.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Simulated area in square meters
    #[serde(default = "default_area_m2")]
    pub area_m2: f64,
    /// Anchor-to-member range in meters; derived from node spacing if absent
    #[serde(default)]
    pub range_m: Option<f64>,
    /// Members per cluster; derived from node density if absent
    #[serde(default)]
    pub capacity: Option<usize>,
    /// Directory the CSV artifact is written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_region_tag")]
    pub region_tag: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            area_m2: default_area_m2(),
            range_m: None,
            capacity: None,
            output_dir: default_output_dir(),
            region_tag: default_region_tag(),
        }
    }
}

impl BuildConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the config.toml file
    ///
    /// # Returns
    /// * `Ok(BuildConfig)` if the file was successfully loaded and parsed
    /// * `Err(String)` with a descriptive error message otherwise
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Derive the config path from a scene file path.
    ///
    /// Replaces the scene filename with "config.toml" in the same directory.
    pub fn config_path_from_scene(scene_path: &str) -> PathBuf {
        let scene = Path::new(scene_path);
        scene.parent().unwrap_or(Path::new(".")).join("config.toml")
    }

    pub fn settings(&self) -> BuildSettings {
        BuildSettings {
            area_m2: self.area_m2,
            range_m: self.range_m,
            capacity: self.capacity,
        }
    }
}
