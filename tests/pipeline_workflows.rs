//! End-to-end pipeline workflows
//!
//! Decode → removal → resize → size-fit encode, driven through
//! `StickerPipeline` the way the CLI and the bot use it.

mod common;

use common::{decode, encode_png, noise, subject_on_backdrop, GREEN, RED};
use std::sync::Arc;
use stickerbot::{
    services::RecordingProgressReporter, BackgroundRemover, CompositionLimits, PipelineConfig,
    ProcessingStage, RasterImage, StickerError, StickerFormat, StickerPipeline,
};

#[test]
fn test_generated_image_round_trip() {
    let scene = subject_on_backdrop(600, 400, 150, 100, 450, 300);
    let input = encode_png(&scene);
    let pipeline = StickerPipeline::new(PipelineConfig::default()).unwrap();

    // removal with the default strategy: 5x5 corner sample, tolerance 30
    let (keyed, stats) = BackgroundRemover::new(pipeline.config().strategy.clone())
        .remove(RasterImage::from_rgba(scene.clone()));
    assert_eq!(stats.removed, 600 * 400 - 300 * 200);
    assert_eq!(stats.eroded, 0);
    for (x, y, pixel) in scene.enumerate_pixels() {
        let expected = if *pixel == RED {
            255
        } else {
            assert_eq!(*pixel, GREEN);
            0
        };
        assert_eq!(keyed.alpha(x, y), Some(expected), "({x},{y})");
    }

    let sticker = pipeline.process_bytes(&input).unwrap();
    assert_eq!(sticker.original_dimensions, (600, 400));
    assert_eq!(sticker.dimensions, (512, 341));
    assert!(sticker.len() <= 512 * 1024);
    assert_eq!(&sticker.bytes[..4], b"RIFF");
    assert_eq!(&sticker.bytes[8..12], b"WEBP");

    let decoded = decode(&sticker.bytes);
    assert_eq!(decoded.dimensions(), (512, 341));
    // corners are backdrop, the centre is the subject
    assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(511, 340).0[3], 0);
    assert_eq!(decoded.get_pixel(256, 170).0[3], 255);
}

#[test]
fn test_small_images_are_not_upscaled() {
    let input = encode_png(&subject_on_backdrop(100, 80, 30, 20, 70, 60));
    let sticker = StickerPipeline::new(PipelineConfig::default())
        .unwrap()
        .process_bytes(&input)
        .unwrap();
    assert_eq!(sticker.dimensions, (100, 80));
    assert_eq!(decode(&sticker.bytes).dimensions(), (100, 80));
}

#[test]
fn test_tall_images_fit_the_long_side() {
    let input = encode_png(&subject_on_backdrop(300, 1200, 100, 400, 200, 800));
    let sticker = StickerPipeline::new(PipelineConfig::default())
        .unwrap()
        .process_bytes(&input)
        .unwrap();
    assert_eq!(sticker.dimensions, (128, 512));
}

#[test]
fn test_oversized_first_attempt_steps_quality_down() {
    // noise does not compress losslessly, so quality 100 cannot fit 300 KiB
    let input = encode_png(&noise(600, 400));
    let config = PipelineConfig::builder()
        .limits(CompositionLimits::compact())
        .tolerance(0.0)
        .build()
        .unwrap();
    let recorder = Arc::new(RecordingProgressReporter::new());
    let pipeline = StickerPipeline::new(config)
        .unwrap()
        .with_progress_reporter(recorder.clone());

    let sticker = pipeline.process_bytes(&input).unwrap();
    assert!(sticker.len() <= 300 * 1024);
    assert!(sticker.attempts > 1);
    assert!(sticker.quality < 100);
    assert_eq!(100 - sticker.quality, 10 * (sticker.attempts as u8 - 1));

    let encodes: Vec<(u8, usize)> = recorder
        .stages()
        .into_iter()
        .filter_map(|stage| match stage {
            ProcessingStage::Encoded { quality, bytes } => Some((quality, bytes)),
            _ => None,
        })
        .collect();
    assert_eq!(encodes.len(), sticker.attempts as usize);
    assert_eq!(encodes.first().map(|e| e.0), Some(100));
    assert!(encodes.first().unwrap().1 > 300 * 1024);
    assert_eq!(encodes.last().unwrap().1, sticker.len());
    assert_eq!(recorder.stages().last(), Some(&ProcessingStage::Done));
}

#[test]
fn test_unreachable_budget_fails_without_partial_output() {
    let input = encode_png(&noise(200, 200));
    let config = PipelineConfig::builder()
        .max_bytes(64)
        .tolerance(0.0)
        .build()
        .unwrap();
    let recorder = Arc::new(RecordingProgressReporter::new());
    let pipeline = StickerPipeline::new(config)
        .unwrap()
        .with_progress_reporter(recorder.clone());

    match pipeline.process_bytes(&input) {
        Err(StickerError::CompressionLimit {
            limit,
            smallest,
            quality,
        }) => {
            assert_eq!(limit, 64);
            assert_eq!(quality, 10);
            assert!(smallest > 64);
        },
        other => panic!("expected CompressionLimit, got {other:?}"),
    }
    assert_eq!(recorder.stages().last(), Some(&ProcessingStage::Failed));
    assert_eq!(recorder.completions(), 0);
}

#[test]
fn test_png_output_for_diagnostics() {
    let input = encode_png(&subject_on_backdrop(64, 64, 16, 16, 48, 48));
    let config = PipelineConfig::builder()
        .format(StickerFormat::Png)
        .build()
        .unwrap();
    let sticker = StickerPipeline::new(config).unwrap().process_bytes(&input).unwrap();

    assert_eq!(sticker.format, StickerFormat::Png);
    assert_eq!(sticker.attempts, 1);
    let decoded = decode(&sticker.bytes);
    assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(32, 32).0, [220, 30, 30, 255]);
}

#[test]
fn test_config_file_round_trip_drives_pipeline() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("pipeline.json");
    let config = PipelineConfig::builder()
        .max_dimension(64)
        .erode(false)
        .build()
        .unwrap();
    config.to_json_file(&path).unwrap();

    let loaded = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);

    let input = encode_png(&subject_on_backdrop(256, 128, 64, 32, 192, 96));
    let sticker = StickerPipeline::new(loaded).unwrap().process_bytes(&input).unwrap();
    assert_eq!(sticker.dimensions, (64, 32));
}

#[tokio::test]
async fn test_batch_keeps_order_and_survives_failures() {
    let pipeline = Arc::new(StickerPipeline::new(PipelineConfig::default()).unwrap());
    let inputs = vec![
        encode_png(&subject_on_backdrop(40, 40, 10, 10, 30, 30)),
        b"definitely not an image".to_vec(),
        Vec::new(),
        encode_png(&subject_on_backdrop(700, 100, 100, 20, 600, 80)),
    ];

    let outcomes = pipeline.process_batch(inputs).await;
    assert_eq!(outcomes.len(), 4);
    assert_eq!(
        outcomes.iter().map(|o| o.index).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1].result, Err(StickerError::Decode(_))));
    assert!(matches!(outcomes[2].result, Err(StickerError::Decode(_))));
    let last = outcomes[3].result.as_ref().unwrap();
    assert_eq!(last.dimensions, (512, 73));
}
