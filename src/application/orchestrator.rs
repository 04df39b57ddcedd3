//! Conversion request orchestrator.
//!
//! Owns the user's choices and the single job record, talks to the catalog
//! and conversion adapters, and publishes every job change on a `watch`
//! channel so a front end can render it. State transitions happen
//! synchronously under the channel's lock; only the upload itself spans time
//! and runs on a spawned task.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::error::{JobFailure, SubmitRejected};
use crate::application::job::{AttemptId, Choices, JobRecord, JobState, StartedAttempt};
use crate::application::outcome::classify;
use crate::application::ports::{
    ConversionTransport, PreferenceStore, ProfileCatalogClient, ProgressSink, UploadProgress,
};
use crate::application::preferences::Preferences;
use crate::application::presenter::ResultPresenter;
use crate::domain::files::{FileSlot, SelectedFile};
use crate::domain::flip::FlipSettings;
use crate::domain::profiles::{ProfileCatalog, ProfileId};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "application::orchestrator";

/// Adapters an orchestrator is assembled from.
pub struct OrchestratorDeps {
    pub preferences: Arc<dyn PreferenceStore>,
    pub catalog: Arc<dyn ProfileCatalogClient>,
    pub transport: Arc<dyn ConversionTransport>,
    pub presenter: ResultPresenter,
}

/// How an attempt ended from the point of view of its task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt settled the job into this terminal state.
    Settled(JobState),
    /// A reset happened first; the response was discarded.
    Superseded,
    /// The task panicked or was aborted before settling.
    Interrupted,
}

/// Handle on an upload started by [`Orchestrator::submit`].
///
/// Dropping it does not cancel the upload.
#[derive(Debug)]
pub struct ConversionTask {
    attempt: AttemptId,
    handle: JoinHandle<AttemptOutcome>,
}

impl ConversionTask {
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub async fn wait(self) -> AttemptOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(attempt = self.attempt, error = %err, "conversion task did not complete");
                AttemptOutcome::Interrupted
            }
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    preferences: Preferences,
    transport: Arc<dyn ConversionTransport>,
    presenter: ResultPresenter,
    catalog: Arc<ProfileCatalog>,
    choices: Arc<RwLock<Choices>>,
    job: Arc<watch::Sender<JobRecord>>,
}

impl Orchestrator {
    /// Read persisted choices and fetch the profile catalog once.
    ///
    /// A catalog failure leaves the catalog empty. A persisted profile id the
    /// catalog does not list is replaced by the first listed id.
    pub async fn initialize(deps: OrchestratorDeps) -> Self {
        let OrchestratorDeps {
            preferences,
            catalog,
            transport,
            presenter,
        } = deps;
        let preferences = Preferences::new(preferences);

        let catalog = match catalog.fetch_all().await {
            Ok(catalog) => {
                info!(profiles = catalog.len(), "profile catalog loaded");
                catalog
            }
            Err(err) => {
                counter!("gerber2png_catalog_fetch_failed_total").increment(1);
                warn!(error = %err, "profile catalog unavailable; continuing without profiles");
                ProfileCatalog::new()
            }
        };

        let mut profile_id = preferences.selected_profile();
        let persisted_is_listed = profile_id.as_ref().is_some_and(|id| catalog.contains(id));
        if !persisted_is_listed && let Some(first) = catalog.first_id() {
            debug!(
                persisted = ?profile_id.as_ref().map(ProfileId::as_str),
                fallback = %first,
                "selecting first listed profile"
            );
            preferences.save_selected_profile(first);
            profile_id = Some(first.clone());
        }

        let choices = Choices {
            profile_id,
            flips: preferences.flips(),
        };
        let (job, _) = watch::channel(JobRecord::new());

        Self {
            preferences,
            transport,
            presenter,
            catalog: Arc::new(catalog),
            choices: Arc::new(RwLock::new(choices)),
            job: Arc::new(job),
        }
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn presenter(&self) -> &ResultPresenter {
        &self.presenter
    }

    pub fn choices(&self) -> Choices {
        rw_read(&self.choices, SOURCE, "choices").clone()
    }

    pub fn selected_profile(&self) -> Option<ProfileId> {
        rw_read(&self.choices, SOURCE, "selected_profile")
            .profile_id
            .clone()
    }

    pub fn flips(&self) -> FlipSettings {
        rw_read(&self.choices, SOURCE, "flips").flips
    }

    /// Choose a profile. The id is not checked against the catalog.
    pub fn select_profile(&self, id: ProfileId) {
        self.preferences.save_selected_profile(&id);
        rw_write(&self.choices, SOURCE, "select_profile").profile_id = Some(id);
    }

    pub fn set_flip_horizontal(&self, value: bool) {
        self.preferences.save_flip_horizontal(value);
        rw_write(&self.choices, SOURCE, "set_flip_horizontal")
            .flips
            .horizontal = value;
    }

    pub fn set_flip_vertical(&self, value: bool) {
        self.preferences.save_flip_vertical(value);
        rw_write(&self.choices, SOURCE, "set_flip_vertical")
            .flips
            .vertical = value;
    }

    pub fn toggle_flip_horizontal(&self) -> bool {
        let value = !self.flips().horizontal;
        self.set_flip_horizontal(value);
        value
    }

    pub fn toggle_flip_vertical(&self) -> bool {
        let value = !self.flips().vertical;
        self.set_flip_vertical(value);
        value
    }

    /// Put a file into a slot. Any previous result stays visible.
    pub fn set_file(&self, slot: FileSlot, file: SelectedFile) {
        debug!(%slot, name = file.name(), size_bytes = file.len(), "file selected");
        self.job.send_modify(|record| record.set_file(slot, file));
    }

    /// Current job record.
    pub fn snapshot(&self) -> JobRecord {
        self.job.borrow().clone()
    }

    /// Follow job changes as they happen.
    pub fn subscribe(&self) -> watch::Receiver<JobRecord> {
        self.job.subscribe()
    }

    /// Start a conversion.
    ///
    /// While an upload is in flight this returns `InFlight` and changes
    /// nothing. With incomplete inputs the job moves to `Failed` with the
    /// validation message and no request is made. Must be called within a
    /// Tokio runtime.
    pub fn submit(&self) -> Result<ConversionTask, SubmitRejected> {
        let choices = self.choices();
        let mut begun = None;
        self.job.send_if_modified(|record| {
            let result = record.begin(&choices);
            let changed = !matches!(
                &result,
                Err(rejected) if rejected.reason == SubmitRejected::InFlight
            );
            begun = Some(result);
            changed
        });

        let started = match begun {
            Some(Ok(started)) => started,
            Some(Err(rejected)) => {
                if let Some(artifact) = rejected.superseded {
                    self.presenter.release(artifact.handle);
                }
                if let SubmitRejected::NotReady(issue) = rejected.reason {
                    counter!("gerber2png_conversion_failed_total", "kind" => "validation")
                        .increment(1);
                    info!(?issue, "submit rejected: inputs incomplete");
                } else {
                    debug!("submit ignored: upload already in flight");
                }
                return Err(rejected.reason);
            }
            None => return Err(SubmitRejected::InFlight),
        };

        if let Some(artifact) = &started.superseded {
            self.presenter.release(artifact.handle);
        }
        counter!("gerber2png_conversion_submitted_total").increment(1);
        info!(
            attempt = started.attempt,
            profile_id = %started.request.profile_id,
            gerber = started.request.gerber.name(),
            drill = started.request.drill.name(),
            payload_bytes = started.request.payload_len(),
            flip_horizontal = started.request.flips.horizontal,
            flip_vertical = started.request.flips.vertical,
            "conversion submitted"
        );

        let attempt = started.attempt;
        let runner = AttemptRunner {
            job: Arc::clone(&self.job),
            transport: Arc::clone(&self.transport),
            presenter: self.presenter.clone(),
        };
        let handle = tokio::spawn(runner.run(started));
        Ok(ConversionTask { attempt, handle })
    }

    /// Submit and wait for the attempt to settle.
    pub async fn convert(&self) -> Result<AttemptOutcome, SubmitRejected> {
        let task = self.submit()?;
        Ok(task.wait().await)
    }

    /// Clear files, result and error, returning to `Idle` from any state.
    ///
    /// An upload in flight is not aborted; its response is discarded.
    pub fn reset(&self) {
        let mut released = None;
        let mut was_uploading = false;
        self.job.send_modify(|record| {
            was_uploading = record.state().is_uploading();
            released = record.reset();
        });
        if let Some(artifact) = released {
            self.presenter.release(artifact.handle);
        }
        debug!(was_uploading, "job reset");
    }
}

/// Drives one attempt from upload to settlement.
struct AttemptRunner {
    job: Arc<watch::Sender<JobRecord>>,
    transport: Arc<dyn ConversionTransport>,
    presenter: ResultPresenter,
}

impl AttemptRunner {
    async fn run(self, started: StartedAttempt) -> AttemptOutcome {
        let attempt = started.attempt;
        let primary_name = started.request.gerber.name().to_string();
        let started_at = Instant::now();

        let (sink, mut events) = ProgressSink::channel();
        let upload = self.transport.convert(started.request, sink);
        tokio::pin!(upload);

        let result = loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => self.apply_progress(attempt, event),
                result = &mut upload => break result,
            }
        };
        self.drain_progress(attempt, &mut events);

        let outcome = classify(result);
        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;

        let mut settled = None;
        self.job.send_if_modified(|record| {
            if !record.is_current(attempt) {
                return false;
            }
            let outcome = match &outcome {
                Ok(body) => Ok(self
                    .presenter
                    .present(body.clone(), Some(primary_name.as_str()))),
                Err(failure) => Err(failure.clone()),
            };
            let changed = record.finish(attempt, outcome);
            settled = Some(record.state().clone());
            changed
        });

        let Some(state) = settled else {
            counter!("gerber2png_conversion_stale_total").increment(1);
            info!(attempt, "conversion finished after reset; result discarded");
            return AttemptOutcome::Superseded;
        };

        histogram!("gerber2png_conversion_duration_ms").record(elapsed_ms);
        match &state {
            JobState::Succeeded { artifact } => {
                counter!("gerber2png_conversion_succeeded_total").increment(1);
                info!(
                    attempt,
                    file_name = %artifact.file_name,
                    size_bytes = artifact.size_bytes,
                    elapsed_ms,
                    "conversion succeeded"
                );
            }
            JobState::Failed { failure } => {
                report_failure(attempt, failure);
            }
            JobState::Idle | JobState::Uploading { .. } => {}
        }
        AttemptOutcome::Settled(state)
    }

    fn apply_progress(&self, attempt: AttemptId, event: UploadProgress) {
        self.job
            .send_if_modified(|record| record.record_progress(attempt, event));
    }

    fn drain_progress(
        &self,
        attempt: AttemptId,
        events: &mut mpsc::UnboundedReceiver<UploadProgress>,
    ) {
        while let Ok(event) = events.try_recv() {
            self.apply_progress(attempt, event);
        }
    }
}

fn report_failure(attempt: AttemptId, failure: &JobFailure) {
    counter!("gerber2png_conversion_failed_total", "kind" => failure.kind()).increment(1);
    warn!(
        attempt,
        kind = failure.kind(),
        error = %failure,
        message = failure.message(),
        "conversion failed"
    );
}
