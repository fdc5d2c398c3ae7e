use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is zero or above the thread pool limit.
    #[error("thread count must be between 1 and the thread pool limit, got {0}")]
    InvalidThreadCount(usize),

    /// The row stride must be valid.
    #[error("row stride must be > 0")]
    InvalidRowStride(usize),

    /// The buffer length is not a whole number of rows.
    #[error("buffer length ({0}) is not a multiple of the row stride ({1})")]
    SizeMismatch(usize, usize),

    /// A worker panicked before finishing its band.
    #[error("worker for {band} panicked: {message}")]
    WorkerPanicked {
        /// The band the worker was processing.
        band: RowBand,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// A worker observed the cancel token before finishing its band.
    #[error("worker for {band} was interrupted after {completed_rows} rows")]
    Interrupted {
        /// The band the worker was processing.
        band: RowBand,
        /// Rows of the band that were written before the interruption.
        completed_rows: usize,
    },
}

/// A half-open range of image rows `[start, end)` owned by a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBand {
    /// First row of the band.
    pub start: usize,
    /// One past the last row of the band.
    pub end: usize,
}

impl RowBand {
    /// Number of rows in the band.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the band holds no rows.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The rows of the band as a range.
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl std::fmt::Display for RowBand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "rows [{}, {})", self.start, self.end)
    }
}

/// Partition `[0, height)` into `num_bands` contiguous row bands.
///
/// The first `num_bands - 1` bands get `height / num_bands` rows each and the
/// last band takes the remainder, so bands may be empty when `num_bands > height`.
///
/// # Errors
///
/// Returns [`ParallelError::InvalidThreadCount`] when `num_bands` is zero or larger
/// than [`rayon::max_num_threads`].
///
/// # Examples
///
/// ```
/// use meanblur_imgproc::parallel::{row_bands, RowBand};
///
/// let bands = row_bands(10, 3).unwrap();
/// assert_eq!(
///     bands,
///     vec![
///         RowBand { start: 0, end: 3 },
///         RowBand { start: 3, end: 6 },
///         RowBand { start: 6, end: 10 },
///     ]
/// );
/// ```
pub fn row_bands(height: usize, num_bands: usize) -> Result<Vec<RowBand>, ParallelError> {
    if num_bands == 0 || num_bands > rayon::max_num_threads() {
        return Err(ParallelError::InvalidThreadCount(num_bands));
    }

    let rows_per_band = height / num_bands;
    let bands = (0..num_bands)
        .map(|i| {
            let start = i * rows_per_band;
            let end = if i == num_bands - 1 {
                height
            } else {
                start + rows_per_band
            };
            RowBand { start, end }
        })
        .collect();

    Ok(bands)
}

/// Controls how the row bands of an image are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Run a single band covering the whole image on the current thread.
    ///
    /// Useful for small images, debugging, or as a reference for the parallel paths.
    Serial,

    /// Split the image into `n` bands and run each on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, torn down when the call returns.
    Fixed(usize),

    /// Same as [`ExecutionStrategy::Fixed`] with one worker per available CPU.
    #[default]
    Auto,
}

impl ExecutionStrategy {
    /// Number of workers (and bands) this strategy runs.
    ///
    /// # Errors
    ///
    /// Returns [`ParallelError::InvalidThreadCount`] for `Fixed(0)` and for counts the
    /// thread pool cannot provide, i.e. above [`rayon::max_num_threads`].
    pub fn num_workers(&self) -> Result<usize, ParallelError> {
        match *self {
            ExecutionStrategy::Serial => Ok(1),
            ExecutionStrategy::Fixed(n) if n == 0 || n > rayon::max_num_threads() => {
                Err(ParallelError::InvalidThreadCount(n))
            }
            ExecutionStrategy::Fixed(n) => Ok(n),
            ExecutionStrategy::Auto => Ok(std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(rayon::max_num_threads())),
        }
    }
}

/// A shared flag used to ask running workers to stop.
///
/// Cloning the token shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every worker observing this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Apply a function to every row of a buffer, one worker per row band.
///
/// The destination is split into disjoint mutable row slices, one per band, and each
/// worker receives only the rows it owns. `f(y, row)` is called in row-major order
/// within a band, and the cancel token is checked before every row.
///
/// The call returns only after every worker has finished. If any worker panicked or was
/// interrupted the first failing band (in row order) is reported, and the caller must
/// treat the contents of `dst` as incomplete.
///
/// # Arguments
///
/// * `dst` - The destination buffer, `height * row_stride` elements.
/// * `row_stride` - The number of elements in one row.
/// * `strategy` - The execution strategy.
/// * `cancel` - Token checked by the workers before each row.
/// * `f` - The operation to perform on each (row index, row slice) pair.
pub fn par_iter_bands<T, F>(
    dst: &mut [T],
    row_stride: usize,
    strategy: ExecutionStrategy,
    cancel: &CancelToken,
    f: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    let num_workers = strategy.num_workers()?;

    if dst.is_empty() {
        return Ok(());
    }

    if row_stride == 0 {
        return Err(ParallelError::InvalidRowStride(row_stride));
    }

    if dst.len() % row_stride != 0 {
        return Err(ParallelError::SizeMismatch(dst.len(), row_stride));
    }

    let height = dst.len() / row_stride;

    if let ExecutionStrategy::Serial = strategy {
        let band = RowBand {
            start: 0,
            end: height,
        };
        return run_band(band, dst, row_stride, cancel, &f);
    }

    let bands = row_bands(height, num_workers)?;

    // hand every band exclusive ownership of its rows
    let mut band_rows = Vec::with_capacity(bands.len());
    let mut rest = dst;
    for band in bands.iter() {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(band.len() * row_stride);
        band_rows.push(head);
        rest = tail;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .thread_name(|i| format!("meanblur-worker-{i}"))
        .build()
        .map_err(|e| ParallelError::BuildError(e.to_string()))?;

    log::debug!(
        "dispatching {} rows over {} workers ({} rows per band)",
        height,
        num_workers,
        height / num_workers
    );

    let mut outcomes: Vec<Result<(), ParallelError>> = bands.iter().map(|_| Ok(())).collect();

    let jobs: Vec<_> = bands
        .iter()
        .copied()
        .zip(band_rows)
        .zip(outcomes.iter_mut())
        .collect();

    let f = &f;
    pool.scope(move |s| {
        for ((band, rows), outcome) in jobs {
            s.spawn(move |_| {
                *outcome = run_band(band, rows, row_stride, cancel, f);
            });
        }
    });

    let mut first_failure = None;
    for outcome in outcomes {
        if let Err(err) = outcome {
            log::warn!("{err}");
            first_failure.get_or_insert(err);
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn run_band<T, F>(
    band: RowBand,
    rows: &mut [T],
    row_stride: usize,
    cancel: &CancelToken,
    f: &F,
) -> Result<(), ParallelError>
where
    F: Fn(usize, &mut [T]),
{
    log::trace!("worker started on {band}");

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        for (completed_rows, (y, row)) in band
            .rows()
            .zip(rows.chunks_exact_mut(row_stride))
            .enumerate()
        {
            if cancel.is_cancelled() {
                return Err(ParallelError::Interrupted {
                    band,
                    completed_rows,
                });
            }
            f(y, row);
        }
        Ok(())
    }));

    result.unwrap_or_else(|payload| {
        Err(ParallelError::WorkerPanicked {
            band,
            message: panic_message(&*payload),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
