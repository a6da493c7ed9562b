//! Error types for narayana-mask

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Model not ready: {0}")]
    ModelNotReady(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Error categories surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Decode,
    Shape,
    InvalidCrop,
    Inference,
    Resource,
    Config,
}

impl MaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MaskError::Decode(_) | MaskError::Image(_) => ErrorKind::Decode,
            MaskError::Shape(_) => ErrorKind::Shape,
            MaskError::InvalidCrop(_) => ErrorKind::InvalidCrop,
            MaskError::Inference(_) | MaskError::ModelNotReady(_) => ErrorKind::Inference,
            MaskError::Resource(_) | MaskError::Io(_) => ErrorKind::Resource,
            MaskError::Config(_) => ErrorKind::Config,
        }
    }

    /// Wrap any failure raised by a model call as an inference error.
    pub(crate) fn into_inference(self) -> MaskError {
        match self {
            MaskError::Inference(_) | MaskError::ModelNotReady(_) => self,
            other => MaskError::Inference(other.to_string()),
        }
    }
}

impl From<ndarray::ShapeError> for MaskError {
    fn from(err: ndarray::ShapeError) -> Self {
        MaskError::Shape(err.to_string())
    }
}

/// User-visible notice produced when a pass cannot complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    /// Create a new notice.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl From<&MaskError> for Notice {
    fn from(err: &MaskError) -> Self {
        let title = match err {
            MaskError::ModelNotReady(_) => "Model not loaded",
            MaskError::Resource(_) | MaskError::Io(_) => "Canvas",
            MaskError::Decode(_) | MaskError::Image(_) => "Image",
            MaskError::Inference(_) => "Inference",
            MaskError::Config(_) => "Configuration",
            MaskError::Shape(_) | MaskError::InvalidCrop(_) => "Processing",
        };
        Notice::new(title, err.to_string())
    }
}
