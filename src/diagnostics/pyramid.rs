use crate::image::ImageView;
use crate::pyramid::Pyramid;
use serde::{Deserialize, Serialize};

/// Statistics for a single level of the image pyramid.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PyramidLevelReport {
    pub level_index: usize,
    pub width: usize,
    pub height: usize,
    pub mean_intensity: f32,
}

/// Pyramid built for feature detection on one image.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PyramidStage {
    pub elapsed_ms: f64,
    pub levels: Vec<PyramidLevelReport>,
}

impl PyramidStage {
    pub fn from_pyramid(pyramid: &Pyramid, elapsed_ms: f64) -> Self {
        let levels = pyramid
            .levels
            .iter()
            .enumerate()
            .map(|(level, lvl)| {
                let sum: f32 = match lvl.as_slice() {
                    Some(slice) => slice.iter().copied().sum(),
                    None => lvl.rows().map(|r| r.iter().copied().sum::<f32>()).sum(),
                };
                PyramidLevelReport {
                    level_index: level,
                    width: lvl.w,
                    height: lvl.h,
                    mean_intensity: sum / (lvl.w * lvl.h).max(1) as f32,
                }
            })
            .collect();
        Self { elapsed_ms, levels }
    }
}
