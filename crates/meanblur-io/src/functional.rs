use std::{fs::File, io::BufWriter, path::Path};

use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, ImageFormat};
use meanblur_image::{Image, ImageSize};

use crate::error::IoError;

/// Reads an image from the given file path as RGB8.
///
/// The method tries to read from any image format supported by the image crate,
/// guessing the format from the file contents. Grayscale images are expanded to
/// three channels and alpha channels are dropped.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// An RGB8 image containing the image data.
pub fn read_image_any_rgb8(file_path: impl AsRef<Path>) -> Result<Image, IoError> {
    let file_path = file_path.as_ref().to_owned();

    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path));
    }

    let img = image::ImageReader::open(&file_path)?
        .with_guessed_format()?
        .decode()?;

    log::debug!(
        "decoded {} as {:?} ({}x{})",
        file_path.display(),
        img.color(),
        img.width(),
        img.height()
    );

    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    Ok(Image::new(size, img.into_rgb8().into_raw())?)
}

/// Writes the given RGB8 image to the given file path.
///
/// # Arguments
///
/// * `file_path` - The path to the output image.
/// * `image` - The image to encode.
/// * `format` - The format to encode with, or `None` to pick it from the file extension.
pub fn write_image(
    file_path: impl AsRef<Path>,
    image: &Image,
    format: Option<ImageFormat>,
) -> Result<(), IoError> {
    let file_path = file_path.as_ref();

    let format = match format {
        Some(format) => format,
        None => ImageFormat::from_path(file_path)
            .map_err(|_| IoError::InvalidFileExtension(file_path.to_path_buf()))?,
    };

    if !format.writing_enabled() {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    let [width, height]: [u32; 2] = image.size().into();
    image::save_buffer_with_format(
        file_path,
        image.as_slice(),
        width,
        height,
        ExtendedColorType::Rgb8,
        format,
    )
    .map_err(IoError::ImageEncodeError)
}

/// Writes the given RGB8 image as JPEG with an explicit quality.
///
/// # Arguments
///
/// - `file_path` - The path to the JPEG image.
/// - `image` - The image to encode.
/// - `quality` - The quality of the JPEG encoding, range from 1 (lowest) to 100 (highest)
pub fn write_image_jpeg(
    file_path: impl AsRef<Path>,
    image: &Image,
    quality: u8,
) -> Result<(), IoError> {
    let writer = BufWriter::new(File::create(file_path)?);
    let mut encoder = JpegEncoder::new_with_quality(writer, quality);

    let [width, height]: [u32; 2] = image.size().into();
    encoder
        .encode(image.as_slice(), width, height, ExtendedColorType::Rgb8)
        .map_err(IoError::ImageEncodeError)
}
