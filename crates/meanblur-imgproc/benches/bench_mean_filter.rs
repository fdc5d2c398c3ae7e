use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use meanblur_image::Image;
use meanblur_imgproc::{filter::mean_filter, parallel::ExecutionStrategy};

fn bench_mean_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mean Filter");

    for (width, height) in [(256, 224), (512, 448), (1024, 896)].iter() {
        for kernel_size in [3, 7, 11].iter() {
            group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

            let image = Image::from_fn([*width, *height].into(), |x, y| {
                [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]
            });

            for strategy in [
                ExecutionStrategy::Serial,
                ExecutionStrategy::Fixed(4),
                ExecutionStrategy::Auto,
            ] {
                let parameter_string =
                    format!("{}x{}x{}/{:?}", width, height, kernel_size, strategy);

                group.bench_with_input(
                    BenchmarkId::new("mean_filter", &parameter_string),
                    &image,
                    |b, i| b.iter(|| black_box(mean_filter(i, *kernel_size, strategy))),
                );
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_mean_filter);
criterion_main!(benches);
