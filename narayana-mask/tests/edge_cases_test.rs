//! Edge case tests for narayana-mask

use narayana_mask::config::MaskConfig;
use narayana_mask::error::MaskError;
use narayana_mask::frame::{RawImage, ResourceLedger};
use narayana_mask::processing::transforms::{center_crop, permute, resize, unsqueeze};
use narayana_mask::processing::{GridLayoutEngine, TensorCodec, Transform, TransformPipeline};
use narayana_mask::tensor::{split_channels, Tensor};

#[test]
fn test_config_edge_cases() {
    let mut config = MaskConfig::default();
    config.input_size = 1;
    config.cell_size = 1;
    config.gap = 0;
    config.columns = 1;
    config.canvas_height = 1;
    assert!(config.validate().is_ok());

    config.columns = 64;
    assert!(config.validate().is_ok());
    config.columns = 65;
    assert!(config.validate().is_err());

    let config = MaskConfig {
        cell_size: u32::MAX,
        ..MaskConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mask.toml");
    std::fs::write(&path, "columns = 4\ngap = 0\nmodel_path = \"u2netp.onnx\"\n").unwrap();

    let config = MaskConfig::load(&path).unwrap();
    assert_eq!(config.columns, 4);
    assert_eq!(config.gap, 0);
    assert_eq!(config.input_size, 224);
    assert_eq!(config.model_path.as_deref(), Some(std::path::Path::new("u2netp.onnx")));

    std::fs::write(&path, "cell_size = 0").unwrap();
    assert!(matches!(MaskConfig::load(&path), Err(MaskError::Config(_))));

    let missing = dir.path().join("missing.toml");
    assert!(matches!(MaskConfig::load(&missing), Err(MaskError::Io(_))));
}

#[test]
fn test_layout_seven_images() {
    let engine = GridLayoutEngine::new(100, 10, 3);
    let rects = engine.positions(7).unwrap();
    let coords: Vec<(u32, u32)> = rects.iter().map(|r| (r.x, r.y)).collect();
    assert_eq!(
        coords,
        vec![
            (10, 10),
            (120, 10),
            (230, 10),
            (10, 120),
            (120, 120),
            (230, 120),
            (10, 230),
        ]
    );
    for (i, a) in rects.iter().enumerate() {
        assert_eq!((a.width, a.height), (100, 100));
        for b in &rects[i + 1..] {
            assert!(!a.overlaps(b));
        }
    }
}

#[test]
fn test_layout_empty_input() {
    let engine = GridLayoutEngine::from_config(&MaskConfig::default());
    assert!(engine.place(Vec::new()).unwrap().is_empty());
}

#[test]
fn test_encode_rejects_short_buffer() {
    let codec = TensorCodec::new();
    let err = codec.encode(&RawImage::new(2, 2, vec![0; 11])).unwrap_err();
    assert!(matches!(err, MaskError::Decode(_)));

    let err = codec.encode(&RawImage::new(0, 4, Vec::new())).unwrap_err();
    assert!(matches!(err, MaskError::Decode(_)));
}

#[test]
fn test_decode_rejects_wrong_rank() {
    let codec = TensorCodec::new();
    let shapes: Vec<Vec<usize>> = vec![vec![4, 4], vec![2, 4, 4], vec![1, 1, 4, 4], vec![1, 0, 4]];
    for shape in &shapes {
        let err = codec.decode(&Tensor::zeros(shape)).unwrap_err();
        assert!(matches!(err, MaskError::Shape(_)), "shape {:?}", shape);
    }
}

#[test]
fn test_decode_saturates_out_of_range_values() {
    let codec = TensorCodec::new();
    let channel = Tensor::from_shape_vec(&[1, 1, 4], vec![-0.5, 0.5, 1.5, f32::NAN]).unwrap();
    let mask = codec.decode(&channel).unwrap();
    let pixels = mask.pixels().to_vec();
    assert_eq!(&pixels[..4], &[0, 128, 255, 0]);
    assert_eq!(&pixels[4..8], &pixels[..4]);
    assert_eq!(&pixels[8..], &pixels[..4]);
}

#[test]
fn test_decoded_masks_tracked_until_dropped() {
    let ledger = ResourceLedger::new();
    let codec = TensorCodec::with_ledger(ledger.clone());
    let masks = codec
        .decode_all(&[Tensor::zeros(&[1, 2, 2]), Tensor::zeros(&[1, 3, 3])])
        .unwrap();
    assert_eq!(ledger.live(), 2);

    let mut masks = masks.into_iter();
    masks.next().unwrap().release();
    assert_eq!(ledger.live(), 1);
    drop(masks);
    assert_eq!(ledger.live(), 0);
}

#[test]
fn test_crop_bounds() {
    let input = Tensor::<f32>::zeros(&[3, 4, 6]);
    assert!(matches!(center_crop(&input, 0), Err(MaskError::InvalidCrop(_))));
    assert!(matches!(center_crop(&input, 5), Err(MaskError::InvalidCrop(_))));
    assert_eq!(center_crop(&input, 4).unwrap().shape(), &[3, 4, 4]);
}

#[test]
fn test_crop_picks_center() {
    let data: Vec<f32> = (0..36).map(|v| v as f32).collect();
    let input = Tensor::from_shape_vec(&[1, 6, 6], data).unwrap();
    assert_eq!(center_crop(&input, 2).unwrap().to_vec(), vec![14.0, 15.0, 20.0, 21.0]);

    // odd remainders round the offset down
    let data: Vec<f32> = (0..5).map(|v| v as f32).collect();
    let row = Tensor::from_shape_vec(&[1, 1, 5], data).unwrap();
    assert_eq!(center_crop(&row, 1).unwrap().to_vec(), vec![2.0]);
}

#[test]
fn test_transforms_reject_wrong_rank() {
    let flat = Tensor::<f32>::zeros(&[4, 4]);
    assert!(matches!(resize(&flat, 2, 2), Err(MaskError::Shape(_))));
    assert!(matches!(center_crop(&flat, 2), Err(MaskError::Shape(_))));
    assert!(matches!(permute(&flat, &[0, 1, 2]), Err(MaskError::Shape(_))));
    assert!(matches!(permute(&flat, &[1, 1]), Err(MaskError::Shape(_))));
    assert!(matches!(unsqueeze(&flat, 3), Err(MaskError::Shape(_))));
}

#[test]
fn test_standard_pipeline_shapes() {
    let pipeline = TransformPipeline::standard(224);
    for (height, width) in [(480, 640), (640, 480), (224, 224), (10, 3)] {
        let input = Tensor::<f32>::zeros(&[height, width, 3]);
        let output = pipeline.apply(&input).unwrap();
        assert_eq!(output.shape(), &[1, 3, 224, 224]);
    }
}

#[test]
fn test_standard_pipeline_does_not_rescale() {
    let pipeline = TransformPipeline::standard(4);
    assert!(!pipeline
        .stages()
        .iter()
        .any(|stage| matches!(stage, Transform::Scale(_))));

    let output = pipeline.apply(&Tensor::full(&[8, 8, 3], 1.0f32)).unwrap();
    assert!(output.to_vec().iter().all(|&v| (v - 1.0).abs() < 1e-5));
}

#[test]
fn test_split_channels_layouts() {
    let batched = split_channels(Tensor::zeros(&[1, 5, 4, 4])).unwrap();
    assert_eq!(batched.len(), 5);
    assert!(batched.iter().all(|t| t.shape() == [1, 4, 4]));

    assert_eq!(split_channels(Tensor::zeros(&[2, 4, 4])).unwrap().len(), 2);
    assert_eq!(split_channels(Tensor::zeros(&[4, 4])).unwrap().len(), 1);
    assert!(split_channels(Tensor::zeros(&[2, 1, 4, 4])).is_err());
    assert!(split_channels(Tensor::zeros(&[4])).is_err());
}
