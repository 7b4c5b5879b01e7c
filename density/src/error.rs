use thiserror::Error;

pub type Result<T> = std::result::Result<T, DensityError>;

#[derive(Debug, Error)]
pub enum DensityError {
    #[error("Bin count must be positive")]
    NoBins,

    #[error("Density map of {0}x{0} bins does not fit in an image")]
    TooLarge(usize),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
