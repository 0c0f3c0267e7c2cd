//! Error paths and boundary inputs of the public API

use alphadrop::{
    apply_refinement, box_filter, erase_stroke, refine_model_mask, segment_by_color, BackgroundRemover,
    BufferKind, ColorSegmenter, Defringe, EraserBrush, GuidedMaskFilter, Image,
    MaskRefinementPipeline, MatteError, RefineMode, RefinementParams, RefinementSession,
    RemovalMethod, ReplaceAlpha,
};
use image::{ImageBuffer, Luma, Rgba};

fn opaque(width: u32, height: u32, rgb: [u8; 3]) -> Image<Rgba<u8>> {
    let [r, g, b] = rgb;
    ImageBuffer::from_pixel(width, height, Rgba([r, g, b, 255]))
}

#[test]
fn short_guide_buffer_is_rejected_before_processing() {
    let mask = vec![255u8; 16];
    let guide = vec![0u8; 4 * 8 * 8 - 1];
    assert_eq!(
        refine_model_mask(&mask, 4, 4, &guide, 8, 8, RefineMode::Soft),
        Err(MatteError::InvalidBufferSize {
            buffer: BufferKind::Guide,
            width: 8,
            height: 8,
            expected: 256,
            actual: 255,
        })
    );
}

#[test]
fn oversized_baseline_buffer_is_rejected() {
    let baseline = vec![0u8; 4 * 3 * 3 + 4];
    assert!(matches!(
        apply_refinement(&baseline, 3, 3, RefinementParams::new(1, 0, 0)),
        Err(MatteError::InvalidBufferSize {
            buffer: BufferKind::Baseline,
            ..
        })
    ));
}

#[test]
fn raw_box_filter_reports_short_buffer() {
    assert!(matches!(
        box_filter(&[0.5; 5], 3, 2, 1),
        Err(MatteError::InvalidBufferSize {
            buffer: BufferKind::Values,
            expected: 6,
            actual: 5,
            ..
        })
    ));
}

#[test]
fn zero_dimensions_are_degenerate() {
    assert_eq!(
        segment_by_color(&[], 5, 0),
        Err(MatteError::DegenerateImage { width: 5, height: 0 })
    );
    assert_eq!(
        refine_model_mask(&[], 0, 0, &[0; 16], 2, 2, RefineMode::Hard),
        Err(MatteError::DegenerateImage { width: 0, height: 0 })
    );

    let mut session = RefinementSession::new();
    assert!(session.capture(Image::new(0, 7)).is_err());
    assert!(session.baseline().is_none());
}

#[test]
fn invalid_parameters_are_reported() {
    assert!(matches!(
        EraserBrush::new(-1.0),
        Err(MatteError::InvalidParameter(_))
    ));
    assert!(matches!(
        ColorSegmenter::new(0.0),
        Err(MatteError::InvalidParameter(_))
    ));
    assert!(matches!(
        GuidedMaskFilter::new(4, 0.0),
        Err(MatteError::InvalidParameter(_))
    ));
    assert!(matches!(
        Defringe::new(200, 100, 10),
        Err(MatteError::InvalidParameter(_))
    ));
}

#[test]
fn mode_and_method_names_parse_case_insensitively() {
    assert_eq!(" Matting ".parse::<RefineMode>(), Ok(RefineMode::Soft));
    assert_eq!("HARD".parse::<RefineMode>(), Ok(RefineMode::Hard));
    assert_eq!("Colour".parse::<RemovalMethod>(), Ok(RemovalMethod::Color));
    assert!(matches!(
        "fuzzy".parse::<RefineMode>(),
        Err(MatteError::InvalidParameter(_))
    ));
}

#[test]
fn alpha_replacement_requires_matching_dimensions() {
    let image = opaque(3, 2, [1, 2, 3]);
    let mask: Image<Luma<u8>> = ImageBuffer::new(2, 3);
    assert_eq!(
        image.with_alpha(&mask),
        Err(MatteError::DimensionMismatch {
            expected: (3, 2),
            actual: (2, 3),
        })
    );
}

#[test]
fn single_pixel_mask_on_tiny_guide() {
    let raw = ImageBuffer::from_pixel(1, 1, Luma([255u8]));
    let guide = opaque(3, 3, [90, 90, 90]);

    for mode in [RefineMode::Soft, RefineMode::Hard] {
        let matte = MaskRefinementPipeline::new(mode).run(&raw, &guide).unwrap();
        assert_eq!(matte.image.dimensions(), (3, 3));
        assert!(matte.image.pixels().all(|p| p[0] == 90 && p[1] == 90 && p[2] == 90));
        // No background class to sample
        assert!(matte.soft_fallbacks.iter().all(MatteError::is_soft_fallback));
    }
}

#[test]
fn all_background_mask_yields_transparent_image() {
    let raw = ImageBuffer::from_pixel(8, 8, Luma([0u8]));
    let guide = opaque(32, 32, [12, 200, 40]);
    let matte = MaskRefinementPipeline::new(RefineMode::Hard).run(&raw, &guide).unwrap();
    assert!(matte.image.pixels().all(|p| p[3] == 0));
}

#[test]
fn uniform_image_is_entirely_background() {
    let image = opaque(20, 20, [64, 128, 32]);
    let result = ColorSegmenter::default().remove_background(&image).unwrap();
    assert!(result.pixels().all(|p| p[3] == 0));
}

#[test]
fn mid_gray_subject_survives_on_white() {
    let image: Image<Rgba<u8>> = ImageBuffer::from_fn(200, 200, |x, y| {
        let inside = (50..150).contains(&x) && (50..150).contains(&y);
        let level = if inside { 150 } else { 255 };
        Rgba([level, level, level, 255])
    });
    let result = segment_by_color(image.as_raw(), 200, 200).unwrap();
    let alpha_at = |x: usize, y: usize| result[(y * 200 + x) * 4 + 3];
    assert_eq!(alpha_at(100, 100), 255);
    assert_eq!(alpha_at(60, 140), 255);
    assert_eq!(alpha_at(10, 10), 0);
}

#[test]
fn empty_stroke_and_offscreen_stroke_do_nothing() {
    let mut canvas = opaque(6, 6, [5, 5, 5]).into_raw();
    let before = canvas.clone();
    erase_stroke(&mut canvas, 6, 6, 3.0, &[]).unwrap();
    erase_stroke(&mut canvas, 6, 6, 3.0, &[(-20.0, -20.0), (-20.0, 40.0)]).unwrap();
    assert_eq!(canvas, before);
}

#[test]
fn removal_without_model_never_reports_model_error() {
    let image = opaque(16, 16, [200, 200, 200]);
    let remover = BackgroundRemover::color_only();
    for method in [RemovalMethod::Matting, RemovalMethod::Segmentation] {
        let result = remover.remove(&image, Some(method)).unwrap();
        assert_eq!(result.method, RemovalMethod::Color);
    }
}

#[test]
fn error_messages_are_human_readable() {
    let error = MatteError::InsufficientColorSamples {
        foreground: 3,
        background: 0,
        required: 10,
    };
    assert!(error.is_soft_fallback());
    assert!(error.to_string().contains("3 foreground"));
    assert!(!MatteError::Codec("truncated".into()).is_soft_fallback());
}
