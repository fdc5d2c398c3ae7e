use std::ops::RangeInclusive;

use meanblur_image::{Image, ImageSize, Rgb8, CHANNELS};

/// The in-bounds window around `(x, y)` as inclusive column and row ranges.
///
/// The radius is `kernel_size / 2`, so even kernel sizes cover the same window as
/// `kernel_size + 1`. Samples outside the image are dropped, not padded.
fn window(
    size: ImageSize,
    x: usize,
    y: usize,
    kernel_size: usize,
) -> (RangeInclusive<usize>, RangeInclusive<usize>) {
    let radius = kernel_size / 2;
    let cols = x.saturating_sub(radius)..=(x + radius).min(size.width - 1);
    let rows = y.saturating_sub(radius)..=(y + radius).min(size.height - 1);
    (cols, rows)
}

/// Number of in-bounds samples averaged for the pixel at `(x, y)`.
///
/// Interior pixels see the full `(2 * (kernel_size / 2) + 1)^2` window, pixels near the
/// border see only the part of the window that lies inside the image.
///
/// PRECONDITION: `(x, y)` lies inside `size`.
///
/// # Examples
///
/// ```
/// use meanblur_image::ImageSize;
/// use meanblur_imgproc::filter::neighborhood_sample_count;
///
/// let size: ImageSize = [5, 5].into();
/// assert_eq!(neighborhood_sample_count(size, 0, 0, 3), 4);
/// assert_eq!(neighborhood_sample_count(size, 2, 2, 3), 9);
/// ```
pub fn neighborhood_sample_count(size: ImageSize, x: usize, y: usize, kernel_size: usize) -> usize {
    let (cols, rows) = window(size, x, y, kernel_size);
    cols.count() * rows.count()
}

/// Compute the average color of the square neighborhood around a pixel.
///
/// Each channel is summed over the in-bounds part of the window and divided by the
/// number of samples visited, truncating towards zero. The center pixel is always part of
/// the window, so the divisor is at least one.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `x` - The column of the center pixel.
/// * `y` - The row of the center pixel.
/// * `kernel_size` - The side length of the averaging window.
///
/// PRECONDITION: `(x, y)` lies inside `src`.
///
/// # Examples
///
/// ```
/// use meanblur_image::Image;
/// use meanblur_imgproc::filter::neighborhood_average;
///
/// let mut image = Image::from_size_val([4, 4].into(), [10, 20, 30]);
/// image.set_pixel(0, 0, [100, 100, 100]);
///
/// assert_eq!(neighborhood_average(&image, 0, 0, 3), [32, 40, 47]);
/// ```
pub fn neighborhood_average(src: &Image, x: usize, y: usize, kernel_size: usize) -> Rgb8 {
    debug_assert!(x < src.width() && y < src.height());

    let (cols, rows) = window(src.size(), x, y, kernel_size);
    let first = *cols.start() * CHANNELS;
    let last = (*cols.end() + 1) * CHANNELS;

    let mut sum = [0u64; CHANNELS];
    let mut count = 0u64;
    for row in rows {
        for pixel in src.row(row)[first..last].chunks_exact(CHANNELS) {
            sum.iter_mut()
                .zip(pixel.iter())
                .for_each(|(s, &v)| *s += v as u64);
            count += 1;
        }
    }

    // every channel sum is at most 255 * count, so the quotient fits in a byte
    sum.map(|s| (s / count) as u8)
}
