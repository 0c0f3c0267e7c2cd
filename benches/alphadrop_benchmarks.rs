//! Performance benchmarks for alphadrop
//!
//! Measures the refinement pipeline, heuristic segmentation and the
//! interactive operators at a few typical sizes.

use alphadrop::{
    analyze, ColorSegmenter, EraserBrush, Image, MaskRefinementPipeline, RefineMode,
    RefinementParams, RefinementSession,
};
use criterion::*;
use image::{ImageBuffer, Luma, Rgba};
use itertools::iproduct;
use std::hint::black_box;

const SIZES: [u32; 3] = [128, 256, 512];

/// Disc of a saturated colour on a light, slightly noisy background
fn create_subject_image(size: u32) -> Image<Rgba<u8>> {
    let mut image: Image<Rgba<u8>> = Image::new(size, size);
    let center = size as f32 / 2.0;
    let radius = size as f32 / 3.0;

    iproduct!(0..size, 0..size).for_each(|(y, x)| {
        let distance = (x as f32 - center).hypot(y as f32 - center);
        let pixel = if distance < radius {
            Rgba([200, 40 + (x % 16) as u8, 30, 255])
        } else {
            let noise = ((x * 7 + y * 13) % 5) as u8;
            Rgba([245 + noise, 245 + noise, 245 + noise, 255])
        };
        image.put_pixel(x, y, pixel);
    });

    image
}

/// Blocky model-resolution mask of the same disc
fn create_model_mask(size: u32) -> Image<Luma<u8>> {
    let center = size as f32 / 2.0;
    let radius = size as f32 / 3.0;
    ImageBuffer::from_fn(size, size, |x, y| {
        let distance = (x as f32 - center).hypot(y as f32 - center);
        Luma([if distance < radius { 255 } else { 0 }])
    })
}

fn bench_refinement_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask_refinement");
    group.sample_size(10);

    for size in SIZES {
        let guide = create_subject_image(size);
        let mask = create_model_mask(size / 4);
        group.throughput(Throughput::Elements(u64::from(size * size)));

        for mode in [RefineMode::Soft, RefineMode::Hard] {
            let pipeline = MaskRefinementPipeline::new(mode);
            group.bench_with_input(
                BenchmarkId::new(mode.as_str(), format!("{size}x{size}")),
                &(&mask, &guide),
                |b, (mask, guide)| b.iter(|| black_box(pipeline.run(mask, guide).unwrap())),
            );
        }
    }

    group.finish();
}

fn bench_color_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("color_segmentation");
    group.sample_size(10);
    let segmenter = ColorSegmenter::default();

    for size in SIZES {
        let image = create_subject_image(size);
        group.throughput(Throughput::Elements(u64::from(size * size)));
        group.bench_with_input(
            BenchmarkId::new("segment", format!("{size}x{size}")),
            &image,
            |b, image| b.iter(|| black_box(segmenter.segment(image).unwrap())),
        );
        group.bench_with_input(
            BenchmarkId::new("analyze", format!("{size}x{size}")),
            &image,
            |b, image| b.iter(|| black_box(analyze(image).unwrap())),
        );
    }

    group.finish();
}

fn bench_slider_refinement(c: &mut Criterion) {
    let mut group = c.benchmark_group("slider_refinement");
    group.sample_size(10);

    for size in SIZES {
        let baseline = ColorSegmenter::default()
            .remove_background(&create_subject_image(size))
            .unwrap();
        let mut session = RefinementSession::new();
        session.capture(baseline).unwrap();
        group.throughput(Throughput::Elements(u64::from(size * size)));

        for (name, params) in [
            ("grow", RefinementParams::new(3, 0, 0)),
            ("feather", RefinementParams::new(0, 4, 0)),
            ("smooth", RefinementParams::new(0, 0, 6)),
            ("combined", RefinementParams::new(-2, 3, 5)),
        ] {
            group.bench_function(BenchmarkId::new(name, format!("{size}x{size}")), |b| {
                b.iter(|| black_box(session.apply(params)))
            });
        }
    }

    group.finish();
}

fn bench_eraser_stroke(c: &mut Criterion) {
    let mut group = c.benchmark_group("eraser");
    group.sample_size(10);
    let brush = EraserBrush::new(24.0).unwrap();

    for size in SIZES {
        let canvas = create_subject_image(size);
        let path: Vec<(f32, f32)> = (0..=16)
            .map(|step| {
                let t = step as f32 / 16.0;
                (t * size as f32, (t * 6.0).sin().mul_add(size as f32 / 4.0, size as f32 / 2.0))
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("stroke", format!("{size}x{size}")),
            &(canvas, path),
            |b, (canvas, path)| {
                b.iter_batched(
                    || canvas.clone(),
                    |mut canvas| {
                        brush.stroke(&mut canvas, path);
                        black_box(canvas)
                    },
                    BatchSize::LargeInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_refinement_pipeline,
    bench_color_segmentation,
    bench_slider_refinement,
    bench_eraser_stroke,
);
criterion_main!(benches);
