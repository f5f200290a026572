//! Full iterative runs on synthetic images of growing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use histoseg_core::GrayImage;
use histoseg_triclass::{ThresholdMethod, TriclassParams, TriclassRunner};

fn gradient_disk(size: usize) -> GrayImage {
    let c = size as f64 / 2.0;
    GrayImage::from_fn(size, size, |x, y| {
        let d = ((x as f64 - c).powi(2) + (y as f64 - c).powi(2)).sqrt() / c;
        (230.0 - 200.0 * d.min(1.0)) as u8
    })
}

fn run(c: &mut Criterion) {
    let mut group = c.benchmark_group("triclass_run");
    for size in [64usize, 256, 512] {
        let img = gradient_disk(size);
        for method in [ThresholdMethod::Otsu, ThresholdMethod::Median] {
            let runner = TriclassRunner::new(TriclassParams {
                initial_threshold_method: method,
                ..TriclassParams::default()
            })
            .unwrap();
            let id = BenchmarkId::new(format!("{method:?}"), size);
            group.bench_with_input(id, &img, |b, img| {
                b.iter(|| runner.segment(black_box(&img.view())).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, run);
criterion_main!(benches);
