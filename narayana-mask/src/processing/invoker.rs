//! Model invocation with shape checks and phase timing

use crate::error::MaskError;
use crate::models::SegmentationModel;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Wall-clock durations of the three phases of a pass.
///
/// Advisory only: nothing in the pipeline branches on these values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub preprocess: Duration,
    pub inference: Duration,
    pub postprocess: Duration,
}

impl PhaseTimings {
    /// Log each phase in milliseconds at info level.
    pub fn log(&self) {
        info!("pack time {:.3} ms", millis(self.preprocess));
        info!("inference time {:.3} ms", millis(self.inference));
        info!("unpack time {:.3} ms", millis(self.postprocess));
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Measures one phase. Each phase is timed independently of the others.
pub struct PhaseTimer {
    start: Instant,
}

impl PhaseTimer {
    /// Start timing a phase now.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time since `start`.
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

/// Forwards model input through an opaque model.
#[derive(Debug, Clone)]
pub struct InferenceInvoker {
    input_size: usize,
}

impl InferenceInvoker {
    /// Create a new invoker for `[1, 3, input_size, input_size]` inputs.
    pub fn new(input_size: usize) -> Self {
        Self { input_size }
    }

    /// Shape every input must have: `[1, 3, S, S]`.
    pub fn input_shape(&self) -> [usize; 4] {
        [1, 3, self.input_size, self.input_size]
    }

    /// Run the model, returning its outputs in order and the inference time.
    ///
    /// Any model failure surfaces as [`MaskError::Inference`]; an empty output
    /// list is returned only when the model itself produced no outputs.
    pub async fn run(
        &self,
        model: &dyn SegmentationModel,
        input: Tensor<f32>,
    ) -> Result<(Vec<Tensor<f32>>, Duration), MaskError> {
        let expected = self.input_shape();
        if input.shape() != expected.as_slice() {
            return Err(MaskError::Shape(format!(
                "model input must be {:?}, got {:?}",
                expected,
                input.shape()
            )));
        }

        let timer = PhaseTimer::start();
        let outputs = model.forward(input).await.map_err(MaskError::into_inference)?;
        let elapsed = timer.stop();

        debug!("Model returned {} outputs", outputs.len());
        Ok((outputs, elapsed))
    }
}
