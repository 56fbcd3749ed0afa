//! JSON configuration of the demo tool.

pub mod stitch;

pub use stitch::{load_config, CameraConfig, StitchOutputConfig, StitchToolConfig};
