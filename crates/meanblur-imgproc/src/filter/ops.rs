use std::time::Instant;

use meanblur_image::{Image, CHANNELS};

use super::neighborhood_average;
use crate::parallel::{par_iter_bands, CancelToken, ExecutionStrategy, ParallelError};

/// Errors returned by the mean filter.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    /// The kernel size must be at least one.
    #[error("kernel size must be > 0, got {0}")]
    InvalidKernelSize(usize),

    /// The workers did not all complete.
    #[error("mean filter failed: {0}")]
    Parallel(#[from] ParallelError),
}

/// Blur an image with a mean (box) filter.
///
/// Every output pixel is the truncated average of the `kernel_size x kernel_size`
/// window around it; samples that fall outside the image are left out of the
/// average. The rows of the image are split into one band per worker, see
/// [`crate::parallel::par_iter_bands`].
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, 3).
/// * `kernel_size` - The side length of the averaging window.
/// * `strategy` - How the row bands are executed.
///
/// # Returns
///
/// A new image with the same size as `src`.
///
/// # Errors
///
/// Fails before any worker is started when `kernel_size` is zero or the strategy
/// asks for zero workers, and fails after joining when any worker did not complete.
///
/// # Examples
///
/// ```
/// use meanblur_image::Image;
/// use meanblur_imgproc::{filter::mean_filter, parallel::ExecutionStrategy};
///
/// let image = Image::from_size_val([8, 6].into(), [1, 2, 3]);
/// let blurred = mean_filter(&image, 3, ExecutionStrategy::Fixed(2)).unwrap();
///
/// assert_eq!(blurred, image);
/// ```
pub fn mean_filter(
    src: &Image,
    kernel_size: usize,
    strategy: ExecutionStrategy,
) -> Result<Image, FilterError> {
    mean_filter_with_cancel(src, kernel_size, strategy, &CancelToken::new())
}

/// Blur an image with a mean filter, stopping early when `cancel` is triggered.
///
/// Same as [`mean_filter`]. A cancelled run returns [`ParallelError::Interrupted`]
/// wrapped in [`FilterError::Parallel`] and the partially written image is discarded.
pub fn mean_filter_with_cancel(
    src: &Image,
    kernel_size: usize,
    strategy: ExecutionStrategy,
    cancel: &CancelToken,
) -> Result<Image, FilterError> {
    if kernel_size == 0 {
        return Err(FilterError::InvalidKernelSize(kernel_size));
    }

    let mut dst = Image::from_size_val(src.size(), [0; CHANNELS]);
    let row_stride = src.row_stride();
    let start = Instant::now();

    par_iter_bands(
        dst.as_slice_mut(),
        row_stride,
        strategy,
        cancel,
        |y, dst_row| {
            dst_row
                .chunks_exact_mut(CHANNELS)
                .enumerate()
                .for_each(|(x, dst_pixel)| {
                    dst_pixel.copy_from_slice(&neighborhood_average(src, x, y, kernel_size));
                });
        },
    )?;

    log::debug!(
        "mean filter {}x{} kernel {} with {:?} took {:?}",
        src.width(),
        src.height(),
        kernel_size,
        strategy,
        start.elapsed()
    );

    Ok(dst)
}

/// Apply a mean filter using exactly `worker_count` workers.
///
/// Shorthand for [`mean_filter`] with [`ExecutionStrategy::Fixed`].
pub fn apply_mean_filter(
    src: &Image,
    kernel_size: usize,
    worker_count: usize,
) -> Result<Image, FilterError> {
    mean_filter(src, kernel_size, ExecutionStrategy::Fixed(worker_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::RowBand;
    use meanblur_image::{ImageError, ImageSize};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_image(size: ImageSize, seed: u64) -> Result<Image, ImageError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..size.area() * CHANNELS).map(|_| rng.random()).collect();
        Image::new(size, data)
    }

    #[test]
    fn test_mean_filter_kernel_one_is_identity() -> Result<(), Box<dyn std::error::Error>> {
        let image = random_image([13, 9].into(), 7)?;
        for workers in [1, 2, 4, 20] {
            let dst = apply_mean_filter(&image, 1, workers)?;
            assert_eq!(dst, image, "{workers} workers");
        }
        Ok(())
    }

    #[test]
    fn test_mean_filter_uniform_image() -> Result<(), Box<dyn std::error::Error>> {
        let image = Image::from_size_val([10, 7].into(), [12, 200, 77]);
        for kernel_size in [1, 2, 3, 5, 8, 15] {
            for workers in [1, 3, 7, 11] {
                let dst = apply_mean_filter(&image, kernel_size, workers)?;
                assert_eq!(dst, image, "kernel {kernel_size}, {workers} workers");
            }
        }
        Ok(())
    }

    #[test]
    fn test_mean_filter_preserves_size() -> Result<(), Box<dyn std::error::Error>> {
        let image = random_image([5, 3].into(), 1)?;
        for kernel_size in [1, 3, 7] {
            for workers in [1, 2, 3, 4, 50] {
                let dst = apply_mean_filter(&image, kernel_size, workers)?;
                assert_eq!(dst.size(), image.size());
                assert_eq!(dst.as_slice().len(), image.as_slice().len());
            }
        }
        Ok(())
    }

    #[test]
    fn test_mean_filter_corner_scenario() -> Result<(), Box<dyn std::error::Error>> {
        let mut image = Image::from_size_val([4, 4].into(), [10, 20, 30]);
        image.set_pixel(0, 0, [100, 100, 100]);

        let dst = apply_mean_filter(&image, 3, 2)?;

        assert_eq!(dst.get_pixel(0, 0), [32, 40, 47]);
        for y in 0..4 {
            for x in 0..4 {
                if x >= 2 || y >= 2 {
                    assert_eq!(dst.get_pixel(x, y), [10, 20, 30], "pixel ({x}, {y})");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_mean_filter_small_example() -> Result<(), Box<dyn std::error::Error>> {
        #[rustfmt::skip]
        let image = Image::new(
            [3, 3].into(),
            vec![
                0, 0, 0,    9, 9, 9,    0, 0, 0,
                9, 9, 9,    90, 90, 90, 9, 9, 9,
                0, 0, 0,    9, 9, 9,    0, 0, 0,
            ],
        )?;

        let dst = mean_filter(&image, 3, ExecutionStrategy::Serial)?;

        #[rustfmt::skip]
        assert_eq!(
            dst.as_slice(),
            &[
                27, 27, 27, 19, 19, 19, 27, 27, 27,
                19, 19, 19, 14, 14, 14, 19, 19, 19,
                27, 27, 27, 19, 19, 19, 27, 27, 27,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_mean_filter_deterministic_across_workers() -> Result<(), Box<dyn std::error::Error>> {
        let image = random_image([31, 23].into(), 42)?;
        let expected = mean_filter(&image, 5, ExecutionStrategy::Serial)?;

        for workers in [1, 2, 5, 100] {
            let dst = apply_mean_filter(&image, 5, workers)?;
            assert_eq!(dst.as_slice(), expected.as_slice(), "{workers} workers");
        }

        let dst = mean_filter(&image, 5, ExecutionStrategy::Auto)?;
        assert_eq!(dst, expected);
        Ok(())
    }

    #[test]
    fn test_mean_filter_leaves_source_untouched() -> Result<(), Box<dyn std::error::Error>> {
        let image = random_image([8, 8].into(), 3)?;
        let before = image.clone();
        let _ = apply_mean_filter(&image, 3, 4)?;
        assert_eq!(image, before);
        Ok(())
    }

    #[test]
    fn test_mean_filter_empty_image() -> Result<(), Box<dyn std::error::Error>> {
        for size in [[0, 0], [0, 5], [5, 0]] {
            let image = Image::new(size.into(), vec![])?;
            let dst = apply_mean_filter(&image, 3, 4)?;
            assert_eq!(dst.size(), image.size());
            assert!(dst.as_slice().is_empty());
        }
        Ok(())
    }

    #[test]
    fn test_mean_filter_invalid_kernel_size() {
        let image = Image::from_size_val([2, 2].into(), [0, 0, 0]);
        assert_eq!(
            apply_mean_filter(&image, 0, 2),
            Err(FilterError::InvalidKernelSize(0))
        );
    }

    #[test]
    fn test_mean_filter_worker_count_above_pool_limit() {
        let image = Image::from_size_val([4, 4].into(), [1, 2, 3]);
        assert_eq!(
            apply_mean_filter(&image, 3, usize::MAX),
            Err(FilterError::Parallel(ParallelError::InvalidThreadCount(
                usize::MAX
            )))
        );

        let too_many = rayon::max_num_threads() + 1;
        assert_eq!(
            apply_mean_filter(&image, 3, too_many),
            Err(FilterError::Parallel(ParallelError::InvalidThreadCount(
                too_many
            )))
        );
    }

    #[test]
    fn test_mean_filter_invalid_worker_count() {
        let image = Image::from_size_val([2, 2].into(), [0, 0, 0]);
        assert_eq!(
            apply_mean_filter(&image, 3, 0),
            Err(FilterError::Parallel(ParallelError::InvalidThreadCount(0)))
        );

        let empty = Image::from_size_val([0, 0].into(), [0, 0, 0]);
        assert_eq!(
            apply_mean_filter(&empty, 3, 0),
            Err(FilterError::Parallel(ParallelError::InvalidThreadCount(0)))
        );
    }

    #[test]
    fn test_mean_filter_cancelled() -> Result<(), ImageError> {
        let _ = env_logger::builder().is_test(true).try_init();

        let image = random_image([6, 6].into(), 9)?;
        let cancel = CancelToken::new();
        cancel.cancel();

        let res = mean_filter_with_cancel(&image, 3, ExecutionStrategy::Fixed(3), &cancel);
        assert_eq!(
            res,
            Err(FilterError::Parallel(ParallelError::Interrupted {
                band: RowBand { start: 0, end: 2 },
                completed_rows: 0,
            }))
        );
        Ok(())
    }
}
