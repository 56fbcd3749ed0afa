use crate::pipeline::{PairLink, StitchOptions};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration of the `stitch_demo` tool.
#[derive(Debug, Deserialize)]
pub struct StitchToolConfig {
    /// Input images, addressed by position in `pairs`.
    pub inputs: Vec<PathBuf>,
    pub pairs: Vec<PairLink>,
    #[serde(default)]
    pub options: StitchOptions,
    /// Physical camera parameters; when present the images are stitched on a
    /// cylinder with the derived pixel focal length.
    #[serde(default)]
    pub camera: Option<CameraConfig>,
    pub output: StitchOutputConfig,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct CameraConfig {
    pub focal_mm: f64,
    pub sensor_width_mm: f64,
}

#[derive(Debug, Deserialize)]
pub struct StitchOutputConfig {
    pub composite: PathBuf,
    #[serde(default)]
    pub report_json: Option<PathBuf>,
    /// Directory for warped layers and distance fields.
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<StitchToolConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    parse_config(&data).map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

pub fn parse_config(data: &str) -> Result<StitchToolConfig, serde_json::Error> {
    serde_json::from_str(data)
}
