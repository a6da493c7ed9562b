//! Mask pipeline orchestrator
//!
//! One pass turns a camera frame into a grid of mask thumbnails:
//! encode, transform, infer, decode, place and draw. At most one pass is in
//! flight; frames arriving meanwhile are dropped. Every failure ends the pass
//! in [`PassState::Error`] with a user-visible [`Notice`], and the frame and
//! any decoded masks are released on every exit path.

use crate::canvas::RenderSurface;
use crate::config::MaskConfig;
use crate::error::{MaskError, Notice};
use crate::frame::{RawImage, ResourceLedger};
use crate::models::ModelSlot;
use crate::processing::{
    GridLayoutEngine, InferenceInvoker, PhaseTimer, PhaseTimings, PlacementRect, TensorCodec,
    TransformPipeline,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// State of the current (or last) pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassState {
    Idle,
    Encoding,
    Transforming,
    Inferring,
    Decoding,
    Placing,
    Done,
    Error,
}

impl PassState {
    /// True between admission and the terminal state of a pass.
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, PassState::Idle | PassState::Done | PassState::Error)
    }
}

/// Result of one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub state: PassState,
    pub placed: Vec<PlacementRect>,
    pub notice: Option<Notice>,
    pub timings: Option<PhaseTimings>,
}

impl PassReport {
    fn failed(pass_id: Uuid, err: &MaskError) -> Self {
        Self {
            pass_id,
            state: PassState::Error,
            placed: Vec::new(),
            notice: Some(Notice::from(err)),
            timings: None,
        }
    }
}

#[derive(Debug)]
pub enum FrameOutcome {
    /// Another pass was in flight
    Dropped,
    Finished(PassReport),
}

/// Frame counts after draining a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub completed: usize,
    pub failed: usize,
    pub dropped: usize,
}

struct PassOutput {
    placed: Vec<PlacementRect>,
    timings: PhaseTimings,
}

/// Holds the single in-flight slot for the duration of a pass.
///
/// If the pass is abandoned before `finish` the state falls to `Error`.
struct PassGuard<'a> {
    state: &'a Mutex<PassState>,
    finished: bool,
}

impl<'a> PassGuard<'a> {
    fn admit(state: &'a Mutex<PassState>) -> Option<Self> {
        let mut current = state.lock();
        if current.is_in_flight() {
            return None;
        }
        *current = PassState::Encoding;
        Some(Self {
            state,
            finished: false,
        })
    }

    fn advance(&self, next: PassState) {
        debug!("Pass state -> {:?}", next);
        *self.state.lock() = next;
    }

    fn finish(mut self, last: PassState) {
        *self.state.lock() = last;
        self.finished = true;
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state.lock() = PassState::Error;
        }
    }
}

/// Sequences codec, transforms, invoker and layout over a render surface.
pub struct MaskPipeline<S: RenderSurface> {
    config: Arc<MaskConfig>,
    models: ModelSlot,
    codec: TensorCodec,
    transforms: TransformPipeline,
    invoker: InferenceInvoker,
    layout: GridLayoutEngine,
    state: Mutex<PassState>,
    surface: tokio::sync::Mutex<Option<S>>,
    ledger: Arc<ResourceLedger>,
}

impl<S: RenderSurface> MaskPipeline<S> {
    /// Create a new pipeline with no surface attached.
    pub fn new(config: MaskConfig, models: ModelSlot) -> Result<Self, MaskError> {
        config
            .validate()
            .map_err(|e| MaskError::Config(format!("Invalid mask config: {}", e)))?;

        let ledger = ResourceLedger::new();
        let config = Arc::new(config);

        Ok(Self {
            codec: TensorCodec::with_ledger(Arc::clone(&ledger)),
            transforms: TransformPipeline::standard(config.input_size),
            invoker: InferenceInvoker::new(config.input_size),
            layout: GridLayoutEngine::from_config(&config),
            config,
            models,
            state: Mutex::new(PassState::Idle),
            surface: tokio::sync::Mutex::new(None),
            ledger,
        })
    }

    /// Validated configuration.
    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    /// Install the surface masks are drawn on, returning the previous one.
    pub async fn attach_surface(&self, surface: S) -> Option<S> {
        self.surface.lock().await.replace(surface)
    }

    /// Remove the surface. Later passes fail until another is attached.
    pub async fn detach_surface(&self) -> Option<S> {
        self.surface.lock().await.take()
    }

    /// Run `f` against the attached surface.
    pub async fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.surface.lock().await.as_ref().map(f)
    }

    /// State of the current pass, or the terminal state of the last one.
    pub fn state(&self) -> PassState {
        *self.state.lock()
    }

    /// Ledger counting decoded masks, and frames tracked with
    /// [`RawImage::with_ledger`].
    pub fn ledger(&self) -> Arc<ResourceLedger> {
        Arc::clone(&self.ledger)
    }

    /// Run one pass over `image`, or drop it if a pass is in flight.
    ///
    /// While the model is still loading the frame is released and reported as
    /// an error without entering the state machine.
    pub async fn handle_frame(&self, image: RawImage) -> FrameOutcome {
        if !self.models.is_ready() {
            let err = MaskError::ModelNotReady("The model is still loading".to_string());
            warn!("Skipping frame: {}", err);
            image.release();
            return FrameOutcome::Finished(PassReport::failed(Uuid::new_v4(), &err));
        }

        let guard = match PassGuard::admit(&self.state) {
            Some(guard) => guard,
            None => {
                debug!("Pass in flight, dropping frame");
                return FrameOutcome::Dropped;
            }
        };

        let pass_id = Uuid::new_v4();
        debug!("Pass {} started", pass_id);

        let report = match self.run_pass(&guard, image).await {
            Ok(output) => {
                guard.finish(PassState::Done);
                info!("Pass {} placed {} masks", pass_id, output.placed.len());
                PassReport {
                    pass_id,
                    state: PassState::Done,
                    placed: output.placed,
                    notice: None,
                    timings: Some(output.timings),
                }
            }
            Err(err) => {
                guard.finish(PassState::Error);
                warn!("Pass {} failed: {}", pass_id, err);
                PassReport::failed(pass_id, &err)
            }
        };

        FrameOutcome::Finished(report)
    }

    async fn run_pass(&self, guard: &PassGuard<'_>, image: RawImage) -> Result<PassOutput, MaskError> {
        let model = self
            .models
            .model()
            .ok_or_else(|| MaskError::ModelNotReady("The model is still loading".to_string()))?;

        let mut attached = self.surface.lock().await;
        let surface = attached
            .as_mut()
            .ok_or_else(|| MaskError::Resource("The canvas is not initialized".to_string()))?;

        surface.clear()?;
        surface.invalidate().await?;

        let timer = PhaseTimer::start();
        let encoded = self.codec.encode(&image)?;
        guard.advance(PassState::Transforming);
        let input = self.transforms.apply(&encoded)?;
        drop(encoded);
        image.release();
        let preprocess = timer.stop();

        guard.advance(PassState::Inferring);
        let (channels, inference) = self.invoker.run(model.as_ref(), input).await?;

        guard.advance(PassState::Decoding);
        let timer = PhaseTimer::start();
        let masks = self.codec.decode_all(&channels)?;
        drop(channels);
        guard.advance(PassState::Placing);
        let placements = self.layout.place(masks)?;
        let postprocess = timer.stop();

        let mut placed = Vec::with_capacity(placements.len());
        for placement in placements {
            surface.draw_image(&placement.mask, placement.rect)?;
            placed.push(placement.rect);
        }
        surface.invalidate().await?;

        let timings = PhaseTimings {
            preprocess,
            inference,
            postprocess,
        };
        if self.config.log_timings {
            timings.log();
        }

        Ok(PassOutput { placed, timings })
    }

    /// Process frames one after the other until the channel closes.
    pub async fn drain(&self, mut frames: mpsc::Receiver<RawImage>) -> StreamSummary {
        let mut summary = StreamSummary::default();
        while let Some(frame) = frames.recv().await {
            match self.handle_frame(frame).await {
                FrameOutcome::Dropped => summary.dropped += 1,
                FrameOutcome::Finished(report) if report.state == PassState::Done => {
                    summary.completed += 1
                }
                FrameOutcome::Finished(_) => summary.failed += 1,
            }
        }
        info!(
            "Frame stream closed: {} completed, {} failed, {} dropped",
            summary.completed, summary.failed, summary.dropped
        );
        summary
    }
}
