//! The conversion orchestrator.
//!
//! [`ConversionPipeline::run`] validates a request, probes the source for a
//! frame count, runs the one or two encoder stages of its [`EncodePlan`], and
//! removes the temporary palette on every exit path. Progress and the final
//! verdict are reported through an [`EventSink`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use gf_av::{
    CommandBuilder, EncodePlan, EncodeStage, MediaProbe, StageKind, TempArtifact,
    ToolRegistry, ToolRunner,
};
use gf_core::config::{Config, ConversionConfig};
use gf_core::{ConversionEvent, ConversionRequest, Error, EventSink, Result, RunId};

use crate::progress::{ProgressParser, ProgressState};
use crate::state::PipelineState;

/// Knobs the pipeline reads from [`Config`].
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub conversion: ConversionConfig,
    pub probe_timeout: Duration,
    pub encode_timeout: Option<Duration>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            conversion: config.conversion.clone(),
            probe_timeout: config.limits.probe_timeout(),
            encode_timeout: config.limits.encode_timeout(),
        }
    }
}

/// Runs one conversion at a time.
pub struct ConversionPipeline {
    runner: Arc<dyn ToolRunner>,
    probe: MediaProbe,
    builder: CommandBuilder,
    conversion: ConversionConfig,
    state: Mutex<PipelineState>,
}

impl ConversionPipeline {
    /// Create a pipeline using the tools in `tools`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`] if ffmpeg or ffprobe is missing.
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        tools: &ToolRegistry,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let probe = MediaProbe::new(tools.ffprobe()?, settings.probe_timeout);
        let builder = CommandBuilder::new(tools.ffmpeg()?, settings.conversion.scratch_dir())
            .overwrite(settings.conversion.overwrite_output)
            .timeout(settings.encode_timeout);

        Ok(Self {
            runner,
            probe,
            builder,
            conversion: settings.conversion,
            state: Mutex::new(PipelineState::Idle),
        })
    }

    /// Current state of the most recent run.
    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    /// The plan `request` would execute, without running anything.
    pub fn plan(&self, request: &ConversionRequest) -> EncodePlan {
        self.builder.build(request)
    }

    /// Convert `request`, returning the output path.
    ///
    /// Emits `BusyChanged(true)`, any number of `ProgressUpdated`, exactly one
    /// `Completed`, then `BusyChanged(false)`.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] (with no events) if a run is already in flight on this
    /// pipeline; otherwise the error that ended the run.
    pub async fn run(
        &self,
        request: &ConversionRequest,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        self.begin()?;
        self.drive(request, events, cancel).await
    }

    /// Claim the pipeline for a new run (`-> Probing`).
    pub(crate) fn begin(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.can_advance_to(PipelineState::Probing) {
            return Err(Error::Busy);
        }
        *state = PipelineState::Probing;
        Ok(())
    }

    /// Body of a run claimed with [`ConversionPipeline::begin`].
    pub(crate) async fn drive(
        &self,
        request: &ConversionRequest,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let run_id = RunId::new();
        let span = tracing::info_span!(
            "conversion",
            run_id = %run_id,
            source = %request.source().display(),
            palette = request.palette(),
        );

        async {
            events.busy(true);
            tracing::debug!("State: {}", PipelineState::Probing);

            let result = self.execute(request, events, cancel).await;

            match &result {
                Ok(output) => {
                    tracing::info!("Conversion completed: {}", output.display());
                    events.emit(ConversionEvent::success(format!(
                        "Conversion completed successfully: {}",
                        output.display()
                    )));
                }
                Err(e) => {
                    tracing::error!(kind = e.kind(), "Conversion failed: {e}");
                    events.emit(ConversionEvent::failure(e.to_string()));
                }
            }
            events.busy(false);
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        request: &ConversionRequest,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        if let Err(e) = request.validate(&self.conversion) {
            self.transition(PipelineState::Failed);
            return Err(e);
        }

        let plan = self.builder.build(request);

        let total = match self
            .probe
            .count_frames(self.runner.as_ref(), request.source(), cancel)
            .await
        {
            Ok(total) => total,
            Err(e) => {
                self.transition(PipelineState::Failed);
                return Err(e);
            }
        };

        let artifact = plan.temp_artifact().map(TempArtifact::new);

        let outcome = self.run_stages(&plan, total, events, cancel).await;

        if let Some(artifact) = artifact {
            artifact.cleanup();
        }

        match outcome {
            Ok(()) => {
                self.transition(PipelineState::Succeeded);
                Ok(plan.output().to_path_buf())
            }
            Err(e) => {
                self.transition(PipelineState::Failed);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        plan: &EncodePlan,
        total: u64,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for stage in plan.stages() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.transition(match stage.kind {
                StageKind::PaletteGen => PipelineState::StagingPalette,
                StageKind::PaletteUse | StageKind::Direct => PipelineState::Encoding,
            });
            self.run_stage(stage, total, events, cancel).await?;
        }
        Ok(())
    }

    async fn run_stage(
        &self,
        stage: &EncodeStage,
        total: u64,
        events: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let label = stage.kind.label();
        tracing::info!("Stage {} ({label}) -> {}", stage.number, stage.output.display());

        let parser = ProgressParser;
        let mut progress = ProgressState::new(total);
        let mut on_line = |line: &str| {
            if let Some(frame) = parser.feed(line) {
                events.progress(progress.observe(frame));
            } else {
                tracing::trace!("{line}");
            }
        };

        let exit = self
            .runner
            .stream(&stage.invocation, &mut on_line, cancel)
            .await
            .map_err(|e| match e {
                Error::Cancelled => Error::Cancelled,
                other => Error::encode(stage.number, label, other.to_string()),
            })?;

        if !exit.success() {
            return Err(Error::encode(stage.number, label, exit.describe()));
        }

        tracing::info!(
            "Stage {} ({label}) finished at frame {}/{}",
            stage.number,
            progress.current(),
            progress.total()
        );
        Ok(())
    }

    fn transition(&self, next: PipelineState) {
        let mut state = self.state.lock();
        if !state.can_advance_to(next) {
            tracing::warn!("Unexpected state transition {} -> {next}", *state);
        }
        tracing::debug!("State: {} -> {next}", *state);
        *state = next;
    }
}

impl std::fmt::Debug for ConversionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("probe", &self.probe)
            .field("builder", &self.builder)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
