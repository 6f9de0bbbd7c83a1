//! Background execution of conversions.
//!
//! A [`ConversionWorker`] owns one [`ConversionPipeline`] and runs each
//! submitted request on a tokio task, so the invoker stays responsive while
//! it drains the [`EventStream`] returned by [`ConversionWorker::new`].

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use gf_core::{ConversionRequest, EventSink, EventStream, Result};

use crate::pipeline::ConversionPipeline;
use crate::state::PipelineState;

/// Runs at most one conversion at a time off the caller's task.
pub struct ConversionWorker {
    pipeline: Arc<ConversionPipeline>,
    events: EventSink,
    cancel: Mutex<CancellationToken>,
}

impl ConversionWorker {
    pub fn new(pipeline: ConversionPipeline) -> (Self, EventStream) {
        let (events, stream) = gf_core::events::channel();
        let worker = Self {
            pipeline: Arc::new(pipeline),
            events,
            cancel: Mutex::new(CancellationToken::new()),
        };
        (worker, stream)
    }

    /// Start converting `request` in the background.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`gf_core::Error::Busy`] without emitting any event if a run
    /// is already in flight.
    pub fn submit(&self, request: ConversionRequest) -> Result<JoinHandle<Result<PathBuf>>> {
        // `cancel` never sees a claimed run paired with the previous token.
        let token = {
            let mut current = self.cancel.lock();
            self.pipeline.begin()?;
            let token = CancellationToken::new();
            *current = token.clone();
            token
        };

        let pipeline = Arc::clone(&self.pipeline);
        let events = self.events.clone();
        Ok(tokio::spawn(async move {
            pipeline.drive(&request, &events, &token).await
        }))
    }

    /// Whether a run is in flight.
    pub fn is_busy(&self) -> bool {
        self.pipeline.state().is_busy()
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Abort the current run, killing any encoder process. The run ends with
    /// a failure completion; no-op when idle.
    pub fn cancel(&self) {
        let token = self.cancel.lock();
        if self.is_busy() {
            tracing::info!("Cancelling conversion");
            token.cancel();
        }
    }
}

impl std::fmt::Debug for ConversionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionWorker")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
