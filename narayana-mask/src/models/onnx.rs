//! ONNX Runtime backed saliency model

use crate::error::MaskError;
use crate::models::SegmentationModel;
use crate::tensor::{split_channels, Tensor};
use async_trait::async_trait;
use ort::session::Session;
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info};

/// Single-input segmentation model loaded from an ONNX file.
///
/// Every f32 output is split into `[1, H, W]` mask channels, so both
/// multi-output networks (one map per output) and single multi-channel
/// outputs are supported.
pub struct OnnxSegmentationModel {
    session: Mutex<Session>,
}

impl OnnxSegmentationModel {
    pub fn from_file(model_path: &Path) -> Result<Self, MaskError> {
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|e| MaskError::Inference(format!("Failed to load model: {}", e)))?;

        info!("Segmentation model loaded from {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

#[async_trait]
impl SegmentationModel for OnnxSegmentationModel {
    async fn forward(&self, input: Tensor<f32>) -> Result<Vec<Tensor<f32>>, MaskError> {
        let shape = input.shape().to_vec();
        let value = ort::value::Tensor::from_array((shape, input.into_vec()))
            .map_err(|e| MaskError::Inference(format!("Failed to create input value: {}", e)))?;

        let raw_outputs = {
            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![value])
                .map_err(|e| MaskError::Inference(format!("Model run failed: {}", e)))?;

            let mut raw = Vec::with_capacity(outputs.len());
            for (name, output) in outputs.iter() {
                let (dims, data) = output.try_extract_tensor::<f32>().map_err(|e| {
                    MaskError::Inference(format!("Failed to extract output {}: {}", name, e))
                })?;
                let dims: Vec<usize> = dims.iter().map(|&d| d.max(0) as usize).collect();
                raw.push(Tensor::from_shape_vec(&dims, data.to_vec())?);
            }
            raw
        };

        let mut channels = Vec::new();
        for output in raw_outputs {
            channels.extend(split_channels(output)?);
        }
        debug!("Model produced {} mask channels", channels.len());
        Ok(channels)
    }
}
