//! Mask processing stages

pub mod codec;
pub mod invoker;
pub mod layout;
pub mod transforms;

pub use codec::TensorCodec;
pub use invoker::{InferenceInvoker, PhaseTimer, PhaseTimings};
pub use layout::{GridLayoutEngine, GridPlacement, PlacementRect};
pub use transforms::{CropSize, Transform, TransformPipeline};
