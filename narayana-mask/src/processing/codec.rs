//! Conversion between raw frames, float tensors and rendered masks

use crate::error::MaskError;
use crate::frame::{RawImage, RenderedMask, ResourceLedger};
use crate::tensor::Tensor;
use ndarray::Axis;
use std::sync::Arc;
use tracing::debug;

const CHANNELS: usize = 3;
const MAX_PIXEL: f32 = 255.0;

/// Encodes camera frames into model tensors and decodes mask channels back
/// into displayable images.
#[derive(Debug, Clone, Default)]
pub struct TensorCodec {
    ledger: Option<Arc<ResourceLedger>>,
}

impl TensorCodec {
    /// Create a new codec that does not track decoded masks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every decoded mask with `ledger`.
    pub fn with_ledger(ledger: Arc<ResourceLedger>) -> Self {
        Self {
            ledger: Some(ledger),
        }
    }

    /// Encode an HWC byte frame into a `[H, W, 3]` float tensor in `[0, 1]`.
    ///
    /// This is the only place pixel values are divided by 255.
    pub fn encode(&self, image: &RawImage) -> Result<Tensor<f32>, MaskError> {
        let (height, width) = (image.height(), image.width());
        if height == 0 || width == 0 {
            return Err(MaskError::Decode(format!(
                "frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }

        let expected = height
            .checked_mul(width)
            .and_then(|p| p.checked_mul(CHANNELS))
            .ok_or_else(|| MaskError::Decode("frame dimensions would overflow".to_string()))?;

        if image.data().len() != expected {
            return Err(MaskError::Decode(format!(
                "buffer holds {} bytes, {}x{}x{} frame needs {}",
                image.data().len(),
                height,
                width,
                CHANNELS,
                expected
            )));
        }

        let data = image
            .data()
            .iter()
            .map(|&sample| sample as f32 / MAX_PIXEL)
            .collect();
        Tensor::from_shape_vec(&[height, width, CHANNELS], data)
    }

    /// Decode a `[1, H, W]` probability map into a `[3, H, W]` RGB mask.
    pub fn decode(&self, channel: &Tensor<f32>) -> Result<RenderedMask, MaskError> {
        let shape = channel.shape();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(MaskError::Shape(format!(
                "mask channel must be [1, H, W], got {:?}",
                shape
            )));
        }
        if shape[1] == 0 || shape[2] == 0 {
            return Err(MaskError::Shape(format!(
                "mask channel has no spatial extent: {:?}",
                shape
            )));
        }

        let gray = channel.as_array().index_axis(Axis(0), 0).mapv(to_pixel);
        let rgb = ndarray::stack(Axis(0), &[gray.view(), gray.view(), gray.view()])?;

        let mask = RenderedMask::new(Tensor::from_array(rgb))?;
        Ok(mask.with_lease(self.ledger.as_ref().map(|ledger| ledger.lease())))
    }

    /// Decode every channel in order.
    ///
    /// On failure the masks decoded so far are dropped, returning their leases.
    pub fn decode_all(&self, channels: &[Tensor<f32>]) -> Result<Vec<RenderedMask>, MaskError> {
        let mut masks = Vec::with_capacity(channels.len());
        for (index, channel) in channels.iter().enumerate() {
            let mask = self.decode(channel).map_err(|e| {
                debug!("Decoding channel {} failed, releasing {} masks", index, masks.len());
                e
            })?;
            masks.push(mask);
        }
        Ok(masks)
    }
}

/// Scale a probability to a byte, rounding and saturating at [0, 255].
fn to_pixel(value: f32) -> u8 {
    let scaled = (value * MAX_PIXEL).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, MAX_PIXEL) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pixel() {
        assert_eq!(to_pixel(0.0), 0);
        assert_eq!(to_pixel(1.0), 255);
        assert_eq!(to_pixel(0.5), 128);
        assert_eq!(to_pixel(-3.0), 0);
        assert_eq!(to_pixel(7.0), 255);
        assert_eq!(to_pixel(f32::NAN), 0);
        assert_eq!(to_pixel(f32::INFINITY), 255);
    }

    #[test]
    fn test_encode_values() {
        let codec = TensorCodec::new();
        let image = RawImage::new(1, 2, vec![0, 51, 255, 255, 0, 102]);
        let tensor = codec.encode(&image).unwrap();
        assert_eq!(tensor.shape(), &[1, 2, 3]);
        let values = tensor.to_vec();
        assert_eq!(values[0], 0.0);
        assert!((values[1] - 0.2).abs() < 1e-6);
        assert_eq!(values[2], 1.0);
        assert!((values[5] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_decode_replicates_channel() {
        let codec = TensorCodec::new();
        let channel = Tensor::from_shape_vec(&[1, 1, 3], vec![0.0, 0.5, 1.0]).unwrap();
        let mask = codec.decode(&channel).unwrap();
        assert_eq!(mask.pixels().shape(), &[3, 1, 3]);
        assert_eq!(mask.pixels().to_vec(), vec![0, 128, 255, 0, 128, 255, 0, 128, 255]);
    }

    #[test]
    fn test_decode_all_releases_partial_on_failure() {
        let ledger = ResourceLedger::new();
        let codec = TensorCodec::with_ledger(ledger.clone());
        let channels = vec![
            Tensor::<f32>::zeros(&[1, 2, 2]),
            Tensor::<f32>::zeros(&[1, 2, 2]),
            Tensor::<f32>::zeros(&[2, 2]),
        ];
        assert!(codec.decode_all(&channels).is_err());
        assert_eq!(ledger.acquired(), 2);
        assert_eq!(ledger.live(), 0);
    }
}
