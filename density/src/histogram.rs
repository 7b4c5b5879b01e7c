use serde::Serialize;

use crate::error::{DensityError, Result};

/// Largest accepted number of bins per side.
pub const MAX_BINS: usize = 4096;

/// Closed interval spanned by the bins of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    /// Extent used when there is nothing to bin.
    pub const UNIT: AxisRange = AxisRange { min: 0.0, max: 1.0 };

    fn of(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if min > max {
            return Self::UNIT;
        }
        if min == max {
            // Zero extent, widen so the value sits in the middle bin.
            return Self { min: min - 0.5, max: max + 0.5 };
        }
        Self { min, max }
    }

    /// Bin of `v` among `bins` equal bins. The last bin includes `max`.
    ///
    /// The index is `floor(t * bins)` for the normalized position `t`
    /// rather than a search over precomputed edges, so a value lying exactly
    /// on an inner edge can land one bin off from an edge search when the
    /// edge is not exactly representable.
    fn bin(&self, v: f64, bins: usize) -> usize {
        let t = (v - self.min) / (self.max - self.min);
        ((t * bins as f64) as usize).min(bins - 1)
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Bin counts over the ground plane.
///
/// Rows run along the depth axis (z for Y-up models) and columns along x,
/// i.e. the transpose of an x-major histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMap {
    width: usize,
    height: usize,
    counts: Vec<u32>,
    x_range: AxisRange,
    z_range: AxisRange,
}

impl DensityMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major counts, `height * width` long.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.counts[row * self.width + col]
    }

    pub fn x_range(&self) -> AxisRange {
        self.x_range
    }

    pub fn z_range(&self) -> AxisRange {
        self.z_range
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Count `(x, z)` pairs on a `bins` x `bins` grid spanning their extent.
pub fn histogram2d(points: &[(f32, f32)], bins: usize) -> Result<DensityMap> {
    if bins == 0 {
        return Err(DensityError::NoBins);
    }
    let cells = match bins.checked_mul(bins) {
        Some(cells) if bins <= MAX_BINS => cells,
        _ => return Err(DensityError::TooLarge(bins)),
    };

    let x_range = AxisRange::of(points.iter().map(|p| p.0 as f64));
    let z_range = AxisRange::of(points.iter().map(|p| p.1 as f64));

    let mut counts = vec![0u32; cells];
    for &(x, z) in points {
        let col = x_range.bin(x as f64, bins);
        let row = z_range.bin(z as f64, bins);
        counts[row * bins + col] += 1;
    }

    Ok(DensityMap {
        width: bins,
        height: bins,
        counts,
        x_range,
        z_range,
    })
}
