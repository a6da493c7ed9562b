use narayana_mask::frame::RawImage;
use narayana_mask::processing::transforms::{center_crop, resize};
use narayana_mask::processing::{GridLayoutEngine, TensorCodec, TransformPipeline};
use narayana_mask::tensor::Tensor;
use proptest::prelude::*;

fn frame_strategy() -> impl Strategy<Value = (usize, usize, Vec<u8>)> {
    (1usize..24, 1usize..24).prop_flat_map(|(height, width)| {
        (
            Just(height),
            Just(width),
            prop::collection::vec(any::<u8>(), height * width * 3),
        )
    })
}

proptest! {
    #[test]
    fn test_encode_property((height, width, data) in frame_strategy()) {
        let codec = TensorCodec::new();
        let encoded = codec.encode(&RawImage::new(height, width, data.clone())).unwrap();

        prop_assert_eq!(encoded.shape(), &[height, width, 3]);
        for (value, byte) in encoded.to_vec().iter().zip(&data) {
            prop_assert!((0.0..=1.0).contains(value));
            prop_assert_eq!((value * 255.0).round() as u8, *byte);
        }
    }

    #[test]
    fn test_standard_pipeline_property((height, width, data) in frame_strategy(), size in 1usize..32) {
        let codec = TensorCodec::new();
        let encoded = codec.encode(&RawImage::new(height, width, data)).unwrap();
        let pipeline = TransformPipeline::standard(size);

        let first = pipeline.apply(&encoded).unwrap();
        let second = pipeline.apply(&encoded).unwrap();
        prop_assert_eq!(first.shape(), &[1, 3, size, size]);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_center_crop_property(height in 1usize..40, width in 1usize..40) {
        let size = height.min(width);
        let input = Tensor::<f32>::zeros(&[3, height, width]);
        let cropped = center_crop(&input, size).unwrap();
        prop_assert_eq!(cropped.shape(), &[3, size, size]);
        prop_assert!(center_crop(&input, size + 1).is_err());
    }

    #[test]
    fn test_center_crop_idempotent(
        height in 1usize..24,
        width in 1usize..24,
        seed in any::<u32>(),
    ) {
        let size = height.min(width);
        let data: Vec<f32> = (0..3 * height * width)
            .map(|i| ((i as u32).wrapping_mul(2_654_435_761) ^ seed) as f32)
            .collect();
        let input = Tensor::from_shape_vec(&[3, height, width], data).unwrap();

        let once = center_crop(&input, size).unwrap();
        let twice = center_crop(&once, size).unwrap();
        prop_assert_eq!(twice.shape(), once.shape());
        prop_assert_eq!(&twice, &once);

        let smaller = center_crop(&once, (size / 2).max(1)).unwrap();
        prop_assert_eq!(center_crop(&smaller, (size / 2).max(1)).unwrap(), smaller);
    }

    #[test]
    fn test_resize_constant_property(
        height in 1usize..20,
        width in 1usize..20,
        out in 1usize..30,
        value in 0.0f32..1.0,
    ) {
        let input = Tensor::full(&[3, height, width], value);
        let resized = resize(&input, out, out).unwrap();
        prop_assert_eq!(resized.shape(), &[3, out, out]);
        for v in resized.to_vec() {
            prop_assert!((v - value).abs() < 1e-5);
        }
    }

    #[test]
    fn test_decode_property(height in 1usize..16, width in 1usize..16, value in 0.0f32..=1.0) {
        let codec = TensorCodec::new();
        let mask = codec.decode(&Tensor::full(&[1, height, width], value)).unwrap();
        prop_assert_eq!(mask.pixels().shape(), &[3, height, width]);

        let expected = (value * 255.0).round() as u8;
        prop_assert!(mask.pixels().to_vec().iter().all(|&p| p == expected));
    }

    #[test]
    fn test_layout_property(count in 0usize..50, cell in 1u32..200, gap in 0u32..30, columns in 1u32..8) {
        let engine = GridLayoutEngine::new(cell, gap, columns);
        let rects = engine.positions(count).unwrap();
        prop_assert_eq!(rects.len(), count);

        for (i, rect) in rects.iter().enumerate() {
            let (row, column) = (i as u32 / columns, i as u32 % columns);
            prop_assert_eq!(rect.x, gap + column * (cell + gap));
            prop_assert_eq!(rect.y, gap + row * (cell + gap));
            prop_assert!(u64::from(rect.x + rect.width) <= engine.row_width_budget() + u64::from(gap));
            for other in &rects[i + 1..] {
                prop_assert!(!rect.overlaps(other));
            }
        }
    }
}
