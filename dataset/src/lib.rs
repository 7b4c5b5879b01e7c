//! Point cloud loading for trained splat models.
//!
//! Only vertex positions are read; per-point appearance attributes such as
//! opacity, scale or spherical harmonics are skipped.

mod error;
mod formats;
mod point_cloud;

pub use error::{DatasetError, FormatError, Result};
pub use formats::{load_point_cloud, read_point_cloud};
pub use point_cloud::{PointCloud, UpAxis};
