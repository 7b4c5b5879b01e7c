mod ply;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{DatasetError, Result};
use crate::point_cloud::PointCloud;

/// Load the vertex positions of the point file at `path`.
pub fn load_point_cloud(path: &Path) -> Result<PointCloud> {
    log::debug!("Loading point cloud from {}", path.display());
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_owned(),
        source,
    })?;
    read_point_cloud(BufReader::new(file))
}

/// Read vertex positions from an ASCII or binary PLY stream.
pub fn read_point_cloud(reader: impl Read) -> Result<PointCloud> {
    let points = ply::read_positions(reader)?;
    if points.is_empty() {
        return Err(DatasetError::Empty);
    }
    log::info!("Loaded {} points", points.len());
    Ok(PointCloud::new(points))
}
