//! Saliency model abstraction and loading

pub mod slot;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use slot::{ModelSlot, SegmentationModel};
#[cfg(feature = "onnx")]
pub use onnx::OnnxSegmentationModel;
