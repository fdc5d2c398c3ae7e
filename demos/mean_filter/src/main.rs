use argh::FromArgs;
use std::path::PathBuf;
use std::time::Instant;

use meanblur::{
    imgproc::{
        filter,
        parallel::{CancelToken, ExecutionStrategy},
    },
    io::functional as F,
};

#[derive(FromArgs, Debug)]
/// Apply a mean filter to an image.
struct Args {
    /// path to the input image
    #[argh(positional)]
    input: PathBuf,

    /// path to the output image
    #[argh(option, short = 'o', default = "PathBuf::from(\"filtered_output.jpg\")")]
    output: PathBuf,

    /// side length of the averaging window
    #[argh(option, short = 'k', default = "7")]
    kernel_size: usize,

    /// number of worker threads
    #[argh(option, short = 'n', default = "4")]
    num_workers: usize,

    /// quality of the jpeg encoding, from 1 to 100
    #[argh(option, default = "90")]
    quality: u8,
}

fn is_jpeg(path: &std::path::Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();

    // a ctrl-c turns into a failed filter instead of a partial output
    let cancel_token = CancelToken::new();
    ctrlc::set_handler({
        let cancel_token = cancel_token.clone();
        move || {
            log::warn!("Received Ctrl-C signal. Sending cancel signal !!");
            cancel_token.cancel();
        }
    })?;

    let image = F::read_image_any_rgb8(&args.input)?;
    log::info!("loaded {} ({})", args.input.display(), image.size());

    let start = Instant::now();
    let filtered = filter::mean_filter_with_cancel(
        &image,
        args.kernel_size,
        ExecutionStrategy::Fixed(args.num_workers),
        &cancel_token,
    )?;
    log::info!(
        "applied {k}x{k} mean filter with {} workers in {:?}",
        args.num_workers,
        start.elapsed(),
        k = args.kernel_size,
    );

    if is_jpeg(&args.output) {
        F::write_image_jpeg(&args.output, &filtered, args.quality)?;
    } else {
        F::write_image(&args.output, &filtered, None)?;
    }

    log::info!("wrote {}", args.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let args = Args::from_args(&["mean_filter"], &["input.png"]).unwrap();
        assert_eq!(args.input, PathBuf::from("input.png"));
        assert_eq!(args.output, PathBuf::from("filtered_output.jpg"));
        assert_eq!(args.kernel_size, 7);
        assert_eq!(args.num_workers, 4);
        assert_eq!(args.quality, 90);
    }

    #[test]
    fn parse_missing_input() {
        assert!(Args::from_args(&["mean_filter"], &[]).is_err());
    }

    #[test]
    fn parse_overrides() {
        let args = Args::from_args(
            &["mean_filter"],
            &["in.jpg", "-o", "out.png", "-k", "3", "-n", "8"],
        )
        .unwrap();
        assert_eq!(args.output, PathBuf::from("out.png"));
        assert_eq!(args.kernel_size, 3);
        assert_eq!(args.num_workers, 8);
    }

    #[test]
    fn jpeg_extension() {
        assert!(is_jpeg(std::path::Path::new("a.JPG")));
        assert!(is_jpeg(std::path::Path::new("a.jpeg")));
        assert!(!is_jpeg(std::path::Path::new("a.png")));
        assert!(!is_jpeg(std::path::Path::new("a")));
    }
}
