use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, DubError};
use crate::processing::{
    BackendClient, ProcessingApi, ProcessingApiFactory, ProcessingOrchestrator, ProcessingSnapshot, RemoteOutcome,
};
use crate::session::VideoFile;
use crate::steps::{format_bytes, DownloadView, LanguageView, UploadView};
use crate::workflow::WorkflowController;

/// What the user asked the headless wizard to do
#[derive(Debug, Clone)]
pub struct WizardOptions {
    pub input: PathBuf,
    pub target_language: String,
    pub media_type: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub download: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    Completed {
        video_url: String,
        file_name: String,
        saved_to: Option<PathBuf>,
    },
    Failed {
        status: String,
        message: String,
    },
    Cancelled,
}

/// Drives the step views and the controller from the command line
pub struct Wizard {
    client: Arc<BackendClient>,
    controller: WorkflowController,
}

impl Wizard {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_api(config, ProcessingApiFactory::create_api(&config.api)?)
    }

    /// Process through `api`; downloads still go to the configured backend
    pub fn with_api(config: &Config, api: Arc<dyn ProcessingApi>) -> Result<Self> {
        let client = Arc::new(BackendClient::new(&config.api)?);
        let orchestrator = ProcessingOrchestrator::from_config(api, &config.processing)?;

        Ok(Self {
            client,
            controller: WorkflowController::new(orchestrator),
        })
    }

    pub fn controller(&self) -> &WorkflowController {
        &self.controller
    }

    /// Run the wizard once; Ctrl-C during processing starts over
    pub async fn run(&mut self, options: &WizardOptions) -> Result<WizardOutcome> {
        self.run_until(options, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run the wizard once. When `cancel` resolves during processing the run is
    /// abandoned and the controller goes back to Upload.
    pub async fn run_until<C>(&mut self, options: &WizardOptions, cancel: C) -> Result<WizardOutcome>
    where
        C: Future<Output = ()>,
    {
        // Upload
        let file = VideoFile::from_path(&options.input, options.media_type.as_deref()).await?;
        let mut upload = UploadView::new();
        upload.select_file(file)?;
        if let Some(selected) = upload.selected() {
            info!("Selected {} ({})", selected.name, format_bytes(selected.size(), 2));
        }
        let original_name = upload.selected().map(|f| f.name.clone()).unwrap_or_default();
        self.controller.on_file_chosen(upload.proceed())?;

        // Language
        let mut language = LanguageView::new();
        if !language.select_target(&options.target_language) {
            return Err(DubError::Config(format!(
                "Unsupported target language '{}'. Run `dubflow languages` for the list.",
                options.target_language
            )));
        }
        let pair = language.proceed().ok_or(DubError::IncompleteSelection)?;
        self.controller.on_language_pair_chosen(&pair.source, &pair.target)?;

        // Processing
        let renderer = match self.controller.processing() {
            Some(run) => spawn_progress_renderer(run.subscribe()),
            None => return Err(DubError::Config("Processing run was not started".to_string())),
        };

        let settled = tokio::select! {
            outcome = self.controller.await_processing() => Some(outcome),
            _ = cancel => None,
        };
        let Some(outcome) = settled else {
            warn!("Interrupted, abandoning the processing run");
            renderer.abort();
            self.controller.restart();
            return Ok(WizardOutcome::Cancelled);
        };
        let outcome = outcome?;
        if let Err(e) = renderer.await {
            warn!("Progress display stopped abnormally: {}", e);
        }

        match outcome {
            RemoteOutcome::Succeeded(video_url) => {
                let mut view = DownloadView::new(video_url, &original_name);
                let saved_to = match (&options.output_dir, options.download) {
                    (Some(dir), true) => Some(view.save_to(&self.client, dir).await?),
                    (None, true) => Some(view.save_to(&self.client, &std::env::current_dir()?).await?),
                    _ => None,
                };

                // Result reported, start over for the next video
                if view.request_restart() {
                    self.controller.restart();
                }
                Ok(WizardOutcome::Completed {
                    video_url: view.video_url().to_string(),
                    file_name: view.file_name().to_string(),
                    saved_to,
                })
            }
            RemoteOutcome::Failed(message) => {
                let status = self.controller
                    .processing()
                    .map(|run| run.snapshot().status)
                    .unwrap_or_else(|| message.clone());
                Ok(WizardOutcome::Failed { status, message })
            }
            RemoteOutcome::Pending => Err(DubError::Remote("Processing ended without an outcome".to_string())),
        }
    }
}

/// Mirror processing snapshots onto a terminal progress bar until the run settles
fn spawn_progress_renderer(mut snapshots: watch::Receiver<ProcessingSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let pb = ProgressBar::new(100);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"));

        loop {
            let terminal = {
                let snapshot = snapshots.borrow_and_update();
                pb.set_position(snapshot.progress as u64);
                pb.set_message(snapshot.status.clone());
                snapshot.is_terminal()
            };
            if terminal || snapshots.changed().await.is_err() {
                break;
            }
        }

        pb.finish();
    })
}
