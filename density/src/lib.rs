//! Top-down density maps of trained point models.
//!
//! Points below a height threshold are projected onto the ground plane and
//! counted on a fixed grid. The grid is stored row-major with rows along the
//! depth axis so it maps directly onto image rows.

mod config;
mod error;
mod histogram;
mod raster;

pub use config::ProjectionConfig;
pub use error::{DensityError, Result};
pub use histogram::{histogram2d, AxisRange, DensityMap, MAX_BINS};
pub use raster::{save_png, to_image};

use dataset::PointCloud;

/// Filter `cloud` by height and bin the survivors.
#[tracing::instrument(skip_all, fields(points = cloud.len(), threshold = config.height_threshold))]
pub fn project(cloud: &PointCloud, config: &ProjectionConfig) -> Result<DensityMap> {
    let finite = cloud.points().iter().filter(|p| p.is_finite()).count();
    if finite < cloud.len() {
        tracing::warn!("Dropping {} points with non-finite coordinates", cloud.len() - finite);
    }

    let ground: Vec<(f32, f32)> = cloud
        .below(config.up_axis, config.height_threshold)
        .map(|p| config.up_axis.ground(p))
        .collect();
    tracing::info!("{} of {} points below threshold", ground.len(), cloud.len());

    if ground.is_empty() {
        tracing::warn!("No points below threshold, density map will be empty");
    }

    histogram2d(&ground, config.bins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset::UpAxis;
    use glam::Vec3;

    #[test]
    fn filters_before_binning() {
        let cloud = PointCloud::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.1, 1.0),
            // Above the threshold, must not widen the extent.
            Vec3::new(100.0, 3.0, 100.0),
        ]);
        let map = project(&cloud, &ProjectionConfig::default()).unwrap();

        assert_eq!(map.total(), 2);
        assert_eq!(map.x_range(), AxisRange { min: 0.0, max: 1.0 });
        assert_eq!(map.z_range(), AxisRange { min: 0.0, max: 1.0 });
        assert_eq!(map.get(0, 0), 1);
        assert_eq!(map.get(99, 99), 1);
    }

    #[test]
    fn grid_shape_is_fixed() {
        let points = (0..500)
            .map(|i| {
                let t = i as f32;
                Vec3::new(t.sin() * 10.0, (t * 0.37).cos(), t.cos() * 3.0)
            })
            .collect();
        let map = project(&PointCloud::new(points), &ProjectionConfig::default()).unwrap();
        assert_eq!((map.width(), map.height()), (100, 100));
        assert_eq!(map.counts().len(), 100 * 100);
    }

    #[test]
    fn single_point_lands_in_middle_bin() {
        let cloud = PointCloud::new(vec![Vec3::new(2.0, -1.0, 3.0), Vec3::new(0.0, 9.0, 0.0)]);
        let map = project(&cloud, &ProjectionConfig::default()).unwrap();
        assert_eq!(map.total(), 1);
        assert_eq!(map.get(50, 50), 1);
        assert_eq!(map.x_range(), AxisRange { min: 1.5, max: 2.5 });
    }

    #[test]
    fn nothing_below_threshold_gives_zero_map() {
        let cloud = PointCloud::new(vec![Vec3::new(0.0, 1.0, 0.0)]);
        let map = project(&cloud, &ProjectionConfig::default()).unwrap();
        assert_eq!((map.width(), map.height()), (100, 100));
        assert_eq!(map.total(), 0);
        assert_eq!(map.x_range(), AxisRange::UNIT);
    }

    #[test]
    fn retained_count_is_monotonic_in_threshold() {
        let cloud = PointCloud::new(
            (0..200)
                .map(|i| Vec3::new(i as f32, (i % 17) as f32 * 0.1 - 0.8, -(i as f32)))
                .collect(),
        );
        let mut last = 0;
        for threshold in [-1.0, -0.5, 0.0, 0.2, 0.4, 0.8, 2.0] {
            let config = ProjectionConfig {
                height_threshold: threshold,
                ..Default::default()
            };
            let total = project(&cloud, &config).unwrap().total();
            assert!(total >= last);
            last = total;
        }
    }

    #[test]
    fn z_up_projects_onto_xy() {
        let cloud = PointCloud::new(vec![Vec3::new(0.0, 0.0, -5.0), Vec3::new(1.0, 1.0, -5.0)]);
        let config = ProjectionConfig {
            up_axis: UpAxis::Z,
            height_threshold: 0.0,
            ..Default::default()
        };
        let map = project(&cloud, &config).unwrap();
        assert_eq!(map.z_range(), AxisRange { min: 0.0, max: 1.0 });
        assert_eq!(map.get(99, 99), 1);
    }
}
