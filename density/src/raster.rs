use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};

use crate::error::{DensityError, Result};
use crate::histogram::DensityMap;

/// Intensity per point in a bin.
const INTENSITY_PER_COUNT: u32 = 255;

/// Grayscale image of `map`, one pixel per bin.
///
/// Counts are multiplied by 255 and saturate at white, so any occupied bin
/// is fully lit.
pub fn to_image(map: &DensityMap) -> Result<GrayImage> {
    let width = u32::try_from(map.width()).map_err(|_| DensityError::TooLarge(map.width()))?;
    let height = u32::try_from(map.height()).map_err(|_| DensityError::TooLarge(map.height()))?;

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let count = map.get(y as usize, x as usize);
        let value = count.saturating_mul(INTENSITY_PER_COUNT).min(u8::MAX as u32);
        Luma([value as u8])
    }))
}

/// Write `map` as an 8-bit grayscale PNG.
#[tracing::instrument(skip(map), fields(path = %path.display()))]
pub fn save_png(map: &DensityMap, path: &Path) -> Result<()> {
    let img = to_image(map)?;
    img.save_with_format(path, ImageFormat::Png)?;
    tracing::info!("Saved density image");
    Ok(())
}
