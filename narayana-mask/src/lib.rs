//! narayana-mask: salient object masks for camera frames
//!
//! Each captured frame runs through one pass: the raw RGB buffer is encoded
//! into a float tensor, cropped and resized to the model input, forwarded
//! through a segmentation model, and every predicted mask is decoded into an
//! RGB image and drawn as a thumbnail in a fixed grid.
//!
//! [`MaskPipeline`] owns the pass state machine. It admits a single pass at a
//! time, converts failures into user-visible notices and releases frames and
//! masks on every exit path.

pub mod canvas;
pub mod config;
pub mod error;
pub mod frame;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod tensor;

pub use canvas::{ImageCanvas, RenderSurface};
pub use config::MaskConfig;
pub use error::{ErrorKind, MaskError, Notice};
pub use frame::{RawImage, RenderedMask, ResourceLedger};
pub use models::{ModelSlot, SegmentationModel};
pub use pipeline::{FrameOutcome, MaskPipeline, PassReport, PassState, StreamSummary};
pub use tensor::Tensor;
