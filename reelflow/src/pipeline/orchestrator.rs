//! The pipeline orchestrator.
//!
//! Runs the five stages strictly in order over a batch, applies the
//! partial-success policy after each stage and records the run's events.
//!
//! Per stage outcome:
//! - fault: error event, status `Failed`, `Err(StageFatal)` to the caller
//! - more outputs than inputs: treated as a fault
//! - no survivors: error event, status `Aborted`, `Ok(summary)`
//! - some dropped: warning event, the run continues
//! - none dropped: the run continues silently

use super::builder::OrchestratorBuilder;
use super::correlate::{correlate, DerivedFrom};
use super::run::{elapsed_ms, PipelineRun};
use super::summary::{RunSummary, StageCount};
use crate::core::{AcquireQuery, EventLevel, PublishItem, RunStatus, StageName, TranscriptRef, VideoRef};
use crate::errors::{ReelflowError, StageFault};
use crate::events::EventLog;
use crate::stages::{AcquireStage, CaptionStage, PublishStage, TranscribeStage, TransformStage};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

/// The five stage adapters a run uses.
#[derive(Debug, Clone)]
pub struct StageSet {
    /// Acquire adapter.
    pub acquire: Arc<dyn AcquireStage>,
    /// Transform adapter.
    pub transform: Arc<dyn TransformStage>,
    /// Transcribe adapter.
    pub transcribe: Arc<dyn TranscribeStage>,
    /// Caption adapter.
    pub caption: Arc<dyn CaptionStage>,
    /// Publish adapter.
    pub publish: Arc<dyn PublishStage>,
}

/// Sequences the stages over one batch at a time.
#[derive(Debug)]
pub struct Orchestrator {
    stages: StageSet,
    seed: AcquireQuery,
    events: Arc<EventLog>,
    running: AtomicBool,
}

/// Holds the re-entry flag for the lifetime of a run.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// What settling a stage's output decided.
enum Settled<T> {
    Continue(Vec<T>),
    Aborted,
}

impl Orchestrator {
    /// Creates an orchestrator over `stages`, seeded with `seed`.
    #[must_use]
    pub fn new(stages: StageSet, seed: AcquireQuery, events: Arc<EventLog>) -> Self {
        Self {
            stages,
            seed,
            events,
            running: AtomicBool::new(false),
        }
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(events: Arc<EventLog>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(events)
    }

    /// Returns the Acquire seed.
    #[must_use]
    pub fn seed(&self) -> &AcquireQuery {
        &self.seed
    }

    /// Returns the event log.
    #[must_use]
    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Returns true while a run is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Executes one run.
    ///
    /// Returns the summary for `Succeeded`, `PartialSuccess` and `Aborted`
    /// runs.
    ///
    /// # Errors
    ///
    /// - [`ReelflowError::RunInProgress`] if another run on this orchestrator
    ///   is active. Nothing is emitted and no stage is invoked.
    /// - [`ReelflowError::StageFatal`] if a stage faulted. The error carries
    ///   the summary of the failed run.
    pub async fn run(&self) -> Result<RunSummary, ReelflowError> {
        let _guard = RunGuard::acquire(&self.running).ok_or(ReelflowError::RunInProgress)?;

        let mut run = PipelineRun::new();
        let span = info_span!("pipeline_run", run_id = %run.run_id());
        self.execute(&mut run).instrument(span).await
    }

    async fn execute(&self, run: &mut PipelineRun) -> Result<RunSummary, ReelflowError> {
        self.emit(run, EventLevel::Info, "run started").await;

        let acquired = self
            .invoke(run, StageName::Acquire, self.seed.len(), self.stages.acquire.run_batch(&self.seed))
            .await?;
        let Settled::Continue(raw) = acquired else {
            return Ok(run.summary());
        };
        self.emit(run, EventLevel::Info, format!("Acquire: {} items acquired", raw.len()))
            .await;

        let transformed = self
            .invoke(run, StageName::Transform, raw.len(), self.stages.transform.run_batch(&raw))
            .await?;
        let Settled::Continue(processed) = transformed else {
            return Ok(run.summary());
        };

        let transcribed = self
            .invoke(run, StageName::Transcribe, processed.len(), self.stages.transcribe.run_batch(&processed))
            .await?;
        let Settled::Continue(transcripts) = transcribed else {
            return Ok(run.summary());
        };
        let pairs: Vec<(VideoRef, TranscriptRef)> = self
            .align(run, StageName::Transcribe, &processed, &transcripts)
            .await?
            .into_iter()
            .zip(transcripts)
            .collect();

        let captioned = self
            .invoke(run, StageName::Caption, pairs.len(), self.stages.caption.run_batch(&pairs))
            .await?;
        let Settled::Continue(captions) = captioned else {
            return Ok(run.summary());
        };
        let items: Vec<PublishItem> = self
            .align(run, StageName::Caption, &pairs, &captions)
            .await?
            .into_iter()
            .zip(captions)
            .map(|((video, _transcript), result)| {
                let (caption, hashtags) = result.into_metadata();
                PublishItem {
                    video,
                    caption,
                    hashtags,
                }
            })
            .collect();

        let published = self
            .invoke(run, StageName::Publish, items.len(), self.stages.publish.run_batch(&items))
            .await?;
        let Settled::Continue(outcomes) = published else {
            return Ok(run.summary());
        };
        self.align(run, StageName::Publish, &items, &outcomes).await?;

        self.emit(
            run,
            EventLevel::Success,
            format!("run completed: {} items published", outcomes.len()),
        )
        .await;
        let status = run.complete()?;
        info!(run_id = %run.run_id(), status = %status, published = outcomes.len(), "run finished");

        Ok(run.summary())
    }

    /// Runs one stage call inside its span, then settles the outcome.
    async fn invoke<T, F>(
        &self,
        run: &mut PipelineRun,
        stage: StageName,
        input: usize,
        call: F,
    ) -> Result<Settled<T>, ReelflowError>
    where
        F: Future<Output = Result<Vec<T>, StageFault>>,
    {
        let span = info_span!("stage", run_id = %run.run_id(), stage = %stage);
        debug!(parent: &span, input, "stage started");

        let started = Instant::now();
        let outcome = call.instrument(span).await;
        let duration_ms = elapsed_ms(started);

        let out = match outcome {
            Ok(out) => out,
            Err(fault) => {
                run.record_stage(StageCount {
                    stage,
                    input,
                    surviving: 0,
                    duration_ms,
                });
                return Err(self.fail(run, stage, fault).await);
            }
        };

        run.record_stage(StageCount {
            stage,
            input,
            surviving: out.len(),
            duration_ms,
        });

        // Acquire fans a seed entry out to several items, so only later
        // stages are held to the sub-sequence bound.
        if stage != StageName::Acquire && out.len() > input {
            let fault = StageFault::new(format!(
                "returned {} items for {} inputs",
                out.len(),
                input
            ));
            return Err(self.fail(run, stage, fault).await);
        }

        if out.is_empty() {
            self.emit(run, EventLevel::Error, format!("{stage}: no items survived"))
                .await;
            run.transition(RunStatus::Aborted)?;
            return Ok(Settled::Aborted);
        }

        if stage != StageName::Acquire && out.len() < input {
            let dropped = input - out.len();
            self.emit(
                run,
                EventLevel::Warning,
                format!("{stage}: {dropped} of {input} items dropped"),
            )
            .await;
            run.mark_warned();
        }

        Ok(Settled::Continue(out))
    }

    /// Pairs survivors with the inputs they came from.
    async fn align<P, S>(
        &self,
        run: &mut PipelineRun,
        stage: StageName,
        previous: &[P],
        survivors: &[S],
    ) -> Result<Vec<P>, ReelflowError>
    where
        P: Clone,
        S: DerivedFrom<P>,
    {
        match correlate(previous, survivors) {
            Ok(matched) => Ok(matched),
            Err(err) => {
                let fault = StageFault::new(err.to_string()).with_source(err);
                Err(self.fail(run, stage, fault).await)
            }
        }
    }

    async fn fail(&self, run: &mut PipelineRun, stage: StageName, fault: StageFault) -> ReelflowError {
        error!(run_id = %run.run_id(), stage = %stage, cause = %fault, "stage fault");
        self.emit(run, EventLevel::Error, format!("{stage} stage failed: {fault}"))
            .await;

        if let Err(err) = run.transition(RunStatus::Failed) {
            return err;
        }

        ReelflowError::StageFatal {
            stage,
            source: fault,
            summary: Box::new(run.summary()),
        }
    }

    async fn emit(&self, run: &mut PipelineRun, level: EventLevel, message: impl Into<String>) {
        let event = self.events.log(message, level).await;
        run.record_event(event);
    }
}
