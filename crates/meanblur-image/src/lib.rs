#![deny(missing_docs)]
//! Image types for the mean filter

/// RGB8 pixel buffer representation.
pub mod image;

/// Error types for the image module.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize, Rgb8, CHANNELS};
