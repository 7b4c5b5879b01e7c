use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Which model axis points up. Reconstructions are assumed to be Y-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAxis {
    #[default]
    Y,
    Z,
}

impl UpAxis {
    /// Height of `point` along this axis.
    pub fn height(self, point: Vec3) -> f32 {
        match self {
            UpAxis::Y => point.y,
            UpAxis::Z => point.z,
        }
    }

    /// The two horizontal coordinates of `point`, ordered (columns, rows) of
    /// the top-down view.
    pub fn ground(self, point: Vec3) -> (f32, f32) {
        match self {
            UpAxis::Y => (point.x, point.z),
            UpAxis::Z => (point.x, point.y),
        }
    }
}

impl fmt::Display for UpAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpAxis::Y => f.write_str("y"),
            UpAxis::Z => f.write_str("z"),
        }
    }
}

impl FromStr for UpAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "y" => Ok(UpAxis::Y),
            "z" => Ok(UpAxis::Z),
            other => Err(format!("unsupported up axis '{other}', expected 'y' or 'z'")),
        }
    }
}

/// Ordered, read-only point positions of a trained model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<Vec3>,
}

impl PointCloud {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Points strictly below `threshold` along `up`, in file order.
    ///
    /// Points with a non-finite coordinate never pass.
    pub fn below(&self, up: UpAxis, threshold: f32) -> impl Iterator<Item = Vec3> + '_ {
        self.points
            .iter()
            .copied()
            .filter(|p| p.is_finite())
            .filter(move |p| up.height(*p) < threshold)
    }
}
