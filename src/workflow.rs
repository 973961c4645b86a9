use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Result, DubError};
use crate::processing::{ProcessingDone, ProcessingHandle, ProcessingOrchestrator, ProcessingRequest, RemoteOutcome};
use crate::session::{Session, Step, VideoFile};

/// Four-step wizard state machine. Owns the session and the mounted processing run.
pub struct WorkflowController {
    session: Session,
    orchestrator: ProcessingOrchestrator,
    generation: u64,
    active_run: Option<ProcessingHandle>,
    done_tx: mpsc::UnboundedSender<ProcessingDone>,
    done_rx: mpsc::UnboundedReceiver<ProcessingDone>,
}

impl WorkflowController {
    pub fn new(orchestrator: ProcessingOrchestrator) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::default(),
            orchestrator,
            generation: 0,
            active_run: None,
            done_tx,
            done_rx,
        }
    }

    pub fn step(&self) -> Step {
        self.session.step
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Generation of the most recent processing run
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The mounted run while in the processing step
    pub fn processing(&self) -> Option<&ProcessingHandle> {
        self.active_run.as_ref()
    }

    fn expect_step(&self, expected: Step, event: &'static str) -> Result<()> {
        if self.session.step == expected {
            Ok(())
        } else {
            Err(DubError::InvalidTransition { step: self.session.step, event })
        }
    }

    /// Upload → Language. `None` is ignored.
    pub fn on_file_chosen(&mut self, file: Option<VideoFile>) -> Result<()> {
        self.expect_step(Step::Upload, "file chosen")?;
        let Some(file) = file else {
            debug!("File chosen without a file, ignoring");
            return Ok(());
        };

        info!("Video selected: {} ({})", file.name, file.media_type);
        self.session.file = Some(file);
        self.session.step = Step::Language;
        Ok(())
    }

    /// Language → Processing; mounts a new processing run
    pub fn on_language_pair_chosen(&mut self, source: &str, target: &str) -> Result<()> {
        self.expect_step(Step::Language, "language pair chosen")?;
        if source.is_empty() || target.is_empty() {
            return Err(DubError::IncompleteSelection);
        }
        let file = self.session.file.clone().ok_or(DubError::InvalidTransition {
            step: self.session.step,
            event: "language pair chosen",
        })?;

        self.session.source_language = source.to_string();
        self.session.target_language = target.to_string();
        self.session.step = Step::Processing;

        self.generation += 1;
        let request = ProcessingRequest {
            file,
            source_language: self.session.source_language.clone(),
            target_language: self.session.target_language.clone(),
        };
        self.active_run = Some(self.orchestrator.activate(request, self.generation, self.done_tx.clone()));
        Ok(())
    }

    /// Processing → Download. Returns `false` when the signal belongs to a superseded run.
    pub fn on_processing_done(&mut self, done: ProcessingDone) -> Result<bool> {
        if done.generation != self.generation {
            debug!(
                "Ignoring completion from generation {} (current {})",
                done.generation, self.generation
            );
            return Ok(false);
        }
        self.expect_step(Step::Processing, "processing done")?;

        info!("Dubbed video ready: {}", done.result_reference);
        self.session.result_reference = Some(done.result_reference);
        self.session.step = Step::Download;
        self.active_run = None;
        Ok(true)
    }

    /// Wait for the mounted run to settle.
    ///
    /// Success advances to Download. Failure leaves the controller in Processing
    /// with the run still showing its error; only `restart` leaves that state.
    pub async fn await_processing(&mut self) -> Result<RemoteOutcome> {
        enum Wake {
            Done(Option<ProcessingDone>),
            Settled(RemoteOutcome),
        }

        loop {
            self.expect_step(Step::Processing, "await processing")?;
            let wake = {
                let run = self.active_run.as_mut().ok_or(DubError::InvalidTransition {
                    step: self.session.step,
                    event: "await processing",
                })?;
                let done_rx = &mut self.done_rx;
                tokio::select! {
                    biased;
                    done = done_rx.recv() => Wake::Done(done),
                    outcome = run.wait_terminal() => Wake::Settled(outcome),
                }
            };

            match wake {
                Wake::Done(Some(done)) => {
                    let reference = done.result_reference.clone();
                    if self.on_processing_done(done)? {
                        return Ok(RemoteOutcome::Succeeded(reference));
                    }
                }
                Wake::Done(None) => {
                    return Err(DubError::Remote("Processing signal channel closed".to_string()));
                }
                Wake::Settled(RemoteOutcome::Failed(message)) => {
                    warn!("Processing failed, waiting for restart: {}", message);
                    return Ok(RemoteOutcome::Failed(message));
                }
                // The success signal is already queued; the next pass picks it up
                Wake::Settled(_) => {}
            }
        }
    }

    /// Back to an empty Upload step from anywhere. A mounted run is torn down
    /// and anything it still reports is ignored.
    pub fn restart(&mut self) {
        self.generation += 1;
        if let Some(run) = self.active_run.take() {
            info!(run_id = %run.run_id(), "Abandoning processing run");
            run.teardown();
        }
        while self.done_rx.try_recv().is_ok() {}

        self.session = Session::default();
        info!("Workflow restarted");
    }
}
