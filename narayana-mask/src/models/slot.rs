//! Model handle shared between passes

use crate::error::MaskError;
use crate::tensor::Tensor;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Opaque salient-object segmentation model.
///
/// Takes a `[1, 3, S, S]` input and returns one tensor per predicted mask.
#[async_trait]
pub trait SegmentationModel: Send + Sync {
    async fn forward(&self, input: Tensor<f32>) -> Result<Vec<Tensor<f32>>, MaskError>;
}

/// Holds the loaded model once it becomes available.
///
/// A model is installed exactly once and is read-only afterwards, so many
/// sequential passes can share it.
#[derive(Clone, Default)]
pub struct ModelSlot {
    model: Arc<RwLock<Option<Arc<dyn SegmentationModel>>>>,
}

impl ModelSlot {
    /// Slot whose model is still loading
    pub fn empty() -> Self {
        Self::default()
    }

    /// Slot with a model that is ready to call
    pub fn ready(model: Arc<dyn SegmentationModel>) -> Self {
        Self {
            model: Arc::new(RwLock::new(Some(model))),
        }
    }

    /// Install the loaded model. Fails if a model is already installed.
    pub fn install(&self, model: Arc<dyn SegmentationModel>) -> Result<(), MaskError> {
        let mut slot = self.model.write();
        if slot.is_some() {
            return Err(MaskError::Config("model is already loaded".to_string()));
        }
        *slot = Some(model);
        info!("Segmentation model ready");
        Ok(())
    }

    /// True once a model has been installed.
    pub fn is_ready(&self) -> bool {
        self.model.read().is_some()
    }

    /// Shared handle to the installed model, if any.
    pub fn model(&self) -> Option<Arc<dyn SegmentationModel>> {
        self.model.read().clone()
    }
}
