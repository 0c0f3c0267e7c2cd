//! End-to-end workflows across the public API
//!
//! Each test chains the operations a host application would call in
//! sequence: model mask refinement, heuristic removal, slider adjustments
//! and manual erasing.

use std::thread;

use alphadrop::{
    apply_refinement, erase_stroke, segment_by_color, AnalyzerConfig, BackgroundRemover,
    ColorSegmenter, Image, MaskRefinementPipeline, MatteResult, RefineMode, RefinementParams,
    RefinementSession, RemovalMethod,
};
use image::{ImageBuffer, Luma, Rgba};

const RED: [u8; 3] = [220, 30, 30];
const WHITE: [u8; 3] = [255, 255, 255];

/// Opaque square of `foreground` inside `[border, size - border)` on a
/// `background` frame
fn framed_square(size: u32, border: u32, background: [u8; 3], foreground: [u8; 3]) -> Image<Rgba<u8>> {
    let inner = border..size - border;
    ImageBuffer::from_fn(size, size, |x, y| {
        let [r, g, b] = if inner.contains(&x) && inner.contains(&y) {
            foreground
        } else {
            background
        };
        Rgba([r, g, b, 255])
    })
}

/// Coarse model-resolution mask covering the middle half of the frame
fn coarse_mask(size: u32) -> Image<Luma<u8>> {
    let inner = size / 4..size * 3 / 4;
    ImageBuffer::from_fn(size, size, |x, y| {
        Luma([if inner.contains(&x) && inner.contains(&y) { 255 } else { 0 }])
    })
}

fn square_model(image: &Image<Rgba<u8>>) -> MatteResult<Image<Luma<u8>>> {
    Ok(coarse_mask(image.width() / 4))
}

fn opaque_count(image: &Image<Rgba<u8>>) -> usize {
    image.pixels().filter(|p| p[3] > 127).count()
}

#[test]
fn model_mask_refinement_then_slider_then_eraser() {
    let guide = framed_square(64, 16, WHITE, RED);
    let matte = MaskRefinementPipeline::new(RefineMode::Soft)
        .run(&coarse_mask(16), &guide)
        .expect("refinement should succeed");

    assert_eq!(matte.image.dimensions(), (64, 64));
    let center = matte.image.get_pixel(32, 32);
    assert!(center[3] >= 240, "center alpha {}", center[3]);
    assert!(center[0] > 200);
    assert!(matte.image.get_pixel(0, 0)[3] < 5);

    // Slider adjustments on the captured result
    let mut session = RefinementSession::new();
    session.capture(matte.image.clone()).unwrap();

    let shrunk = session.apply(RefinementParams::new(-3, 0, 0)).unwrap();
    assert!(opaque_count(&shrunk) < opaque_count(&matte.image));

    let restored = session.apply(RefinementParams::IDENTITY).unwrap();
    assert_eq!(restored, matte.image);

    // Manual erase across the middle row
    let mut canvas = restored.into_raw();
    erase_stroke(&mut canvas, 64, 64, 4.0, &[(20.0, 32.0), (44.0, 32.0)]).unwrap();
    for x in 20..=44usize {
        let offset = (32 * 64 + x) * 4;
        assert_eq!(canvas[offset + 3], 0, "x = {x}");
        assert_eq!(&canvas[offset..offset + 3], &matte.image.get_pixel(x as u32, 32).0[..3]);
    }
}

#[test]
fn color_removal_then_grow_and_reset() {
    let image = framed_square(60, 15, WHITE, [10, 120, 220]);
    let result = BackgroundRemover::color_only()
        .remove(&image, Some(RemovalMethod::Color))
        .unwrap();

    let mut session = RefinementSession::new();
    session.capture(result.image.clone()).unwrap();

    let grown = session.apply(RefinementParams::new(2, 0, 0)).unwrap();
    assert!(opaque_count(&grown) > opaque_count(&result.image));

    let feathered = session.apply(RefinementParams::new(0, 3, 0)).unwrap();
    assert!(feathered.pixels().any(|p| (1..255).contains(&p[3])));

    session.invalidate();
    assert!(session.apply(RefinementParams::new(2, 0, 0)).is_none());
}

#[test]
fn byte_buffer_entry_points_match_image_api() {
    let image = framed_square(48, 12, WHITE, RED);
    let bytes = segment_by_color(image.as_raw(), 48, 48).unwrap();
    let direct = ColorSegmenter::default().remove_background(&image).unwrap();
    assert_eq!(bytes, direct.into_raw());

    let params = RefinementParams::new(1, 2, 3);
    let first = apply_refinement(&bytes, 48, 48, params).unwrap();
    let second = apply_refinement(&bytes, 48, 48, params).unwrap();
    assert_eq!(first, second);
}

#[test]
fn auto_selection_can_route_to_model() {
    let image = framed_square(64, 16, WHITE, RED);
    let remover = BackgroundRemover::with_model(square_model).with_analyzer(AnalyzerConfig {
        entropy_threshold: 0.0,
    });

    let result = remover.remove(&image, None).unwrap();
    assert_eq!(result.method, RemovalMethod::Segmentation);
    assert_eq!(
        result.analysis.map(|analysis| analysis.recommended),
        Some(RemovalMethod::Segmentation)
    );
    assert_eq!(result.image.get_pixel(32, 32)[3], 255);
}

#[test]
fn refinement_jobs_run_off_thread() {
    let image = framed_square(40, 10, WHITE, RED);
    let baseline = ColorSegmenter::default().remove_background(&image).unwrap();

    let mut session = RefinementSession::new();
    session.capture(baseline).unwrap();

    let stale = session.request(RefinementParams::new(3, 0, 0)).unwrap();
    let latest = session.request(RefinementParams::new(-1, 0, 0)).unwrap();

    let stale = thread::spawn(move || stale.run()).join().unwrap();
    let latest = thread::spawn(move || latest.run()).join().unwrap();

    assert!(session.accept(stale).is_none());
    assert!(session.accept(latest).is_some());
}

#[cfg(feature = "codec")]
#[test]
fn decode_remove_encode_round_trip() {
    use alphadrop::{encode_png, load_rgba};

    let source = encode_png(&framed_square(40, 10, WHITE, RED)).unwrap();
    let image = load_rgba(&source).unwrap();
    let result = BackgroundRemover::color_only()
        .remove(&image, Some(RemovalMethod::Color))
        .unwrap();

    let encoded = encode_png(&result.image).unwrap();
    let reloaded = load_rgba(&encoded).unwrap();
    assert_eq!(reloaded.dimensions(), (40, 40));
    assert_eq!(reloaded.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    assert_eq!(reloaded.get_pixel(20, 20), &Rgba([220, 30, 30, 255]));
}
