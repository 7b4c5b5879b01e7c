use dataset::UpAxis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Points with a height strictly below this are kept.
    pub height_threshold: f32,

    /// Axis treated as vertical.
    pub up_axis: UpAxis,

    /// Number of bins along each ground axis.
    pub bins: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            height_threshold: 0.2,
            up_axis: UpAxis::Y,
            bins: 100,
        }
    }
}
