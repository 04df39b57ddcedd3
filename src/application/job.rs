//! Lifecycle of the single conversion job owned by an orchestrator.
//!
//! The record is only ever `Idle`, `Uploading`, `Succeeded` or `Failed`.
//! "Ready" is a predicate over the file slots and the chosen profile that
//! decides whether `begin` may start an upload. Every upload is tagged with an
//! attempt number; progress and completions carrying an older number are
//! ignored so a reset cannot be undone by a late response.

use crate::application::error::{JobFailure, SubmitRejected, ValidationIssue};
use crate::application::ports::{ConversionRequest, UploadProgress};
use crate::application::presenter::Artifact;
use crate::domain::files::{FileSlot, SelectedFile};
use crate::domain::flip::FlipSettings;
use crate::domain::profiles::ProfileId;

/// Identifies one upload attempt within an orchestrator.
pub type AttemptId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Uploading { progress: u8 },
    Succeeded { artifact: Artifact },
    Failed { failure: JobFailure },
}

impl JobState {
    pub fn is_uploading(&self) -> bool {
        matches!(self, JobState::Uploading { .. })
    }

    pub fn progress(&self) -> u8 {
        match self {
            JobState::Uploading { progress } => *progress,
            JobState::Succeeded { .. } => 100,
            JobState::Idle | JobState::Failed { .. } => 0,
        }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            JobState::Succeeded { artifact } => Some(artifact),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            JobState::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}

/// The profile and flags a submit should use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choices {
    pub profile_id: Option<ProfileId>,
    pub flips: FlipSettings,
}

/// An upload that `begin` has accepted.
#[derive(Debug)]
pub struct StartedAttempt {
    pub attempt: AttemptId,
    pub request: ConversionRequest,
    /// Result of the previous run, to be released by the caller.
    pub superseded: Option<Artifact>,
}

/// A submit that `begin` turned down.
#[derive(Debug)]
pub struct RejectedAttempt {
    pub reason: SubmitRejected,
    /// Result displaced by a validation failure, to be released by the caller.
    pub superseded: Option<Artifact>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    gerber: Option<SelectedFile>,
    drill: Option<SelectedFile>,
    state: JobState,
    attempt: AttemptId,
}

impl Default for JobRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRecord {
    pub fn new() -> Self {
        Self {
            gerber: None,
            drill: None,
            state: JobState::Idle,
            attempt: 0,
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn file(&self, slot: FileSlot) -> Option<&SelectedFile> {
        match slot {
            FileSlot::Gerber => self.gerber.as_ref(),
            FileSlot::Drill => self.drill.as_ref(),
        }
    }

    /// Number of the most recent attempt; `0` before the first submit.
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn is_current(&self, attempt: AttemptId) -> bool {
        self.attempt == attempt && self.state.is_uploading()
    }

    /// Fill a slot. The lifecycle state, including a previous result, is untouched.
    pub fn set_file(&mut self, slot: FileSlot, file: SelectedFile) {
        match slot {
            FileSlot::Gerber => self.gerber = Some(file),
            FileSlot::Drill => self.drill = Some(file),
        }
    }

    /// What is missing for a submit to proceed, if anything.
    pub fn readiness(&self, choices: &Choices) -> Result<(), ValidationIssue> {
        if self.gerber.is_none() || self.drill.is_none() {
            return Err(ValidationIssue::MissingFiles);
        }
        if choices.profile_id.is_none() {
            return Err(ValidationIssue::MissingProfile);
        }
        Ok(())
    }

    /// Start an attempt, or record why it cannot start.
    ///
    /// While uploading this is a no-op returning `InFlight`. When inputs are
    /// incomplete the record moves to `Failed` with a validation failure and
    /// no attempt number is consumed.
    pub fn begin(&mut self, choices: &Choices) -> Result<StartedAttempt, RejectedAttempt> {
        if self.state.is_uploading() {
            return Err(RejectedAttempt {
                reason: SubmitRejected::InFlight,
                superseded: None,
            });
        }

        let (gerber, drill, profile_id) =
            match (&self.gerber, &self.drill, &choices.profile_id) {
                (Some(gerber), Some(drill), Some(profile_id)) => {
                    (gerber.clone(), drill.clone(), profile_id.clone())
                }
                _ => {
                    let issue = self
                        .readiness(choices)
                        .err()
                        .unwrap_or(ValidationIssue::MissingFiles);
                    let previous = self.replace_state(JobState::Failed {
                        failure: JobFailure::Validation(issue),
                    });
                    return Err(RejectedAttempt {
                        reason: SubmitRejected::NotReady(issue),
                        superseded: previous,
                    });
                }
            };

        self.attempt += 1;
        let superseded = self.replace_state(JobState::Uploading { progress: 0 });

        Ok(StartedAttempt {
            attempt: self.attempt,
            request: ConversionRequest {
                gerber,
                drill,
                profile_id,
                flips: choices.flips,
            },
            superseded,
        })
    }

    /// Apply a progress notification. Returns whether the visible value changed.
    ///
    /// Notifications for another attempt, without a known total, or lower
    /// than the current value are ignored.
    pub fn record_progress(&mut self, attempt: AttemptId, event: UploadProgress) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        let Some(percent) = event.percent() else {
            return false;
        };
        match &mut self.state {
            JobState::Uploading { progress } if percent > *progress => {
                *progress = percent;
                true
            }
            _ => false,
        }
    }

    /// Settle the current attempt. Returns `false` for a stale attempt.
    pub fn finish(&mut self, attempt: AttemptId, outcome: Result<Artifact, JobFailure>) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        self.state = match outcome {
            Ok(artifact) => JobState::Succeeded { artifact },
            Err(failure) => JobState::Failed { failure },
        };
        true
    }

    /// Clear files, result and error from any state.
    ///
    /// Returns the artifact that was being shown so the caller can release it.
    /// An upload in flight keeps running but its completion no longer matches.
    pub fn reset(&mut self) -> Option<Artifact> {
        self.gerber = None;
        self.drill = None;
        self.replace_state(JobState::Idle)
    }

    /// Swap in `next`, handing back the artifact the old state was showing.
    fn replace_state(&mut self, next: JobState) -> Option<Artifact> {
        match std::mem::replace(&mut self.state, next) {
            JobState::Succeeded { artifact } => Some(artifact),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::application::presenter::ResultPresenter;

    fn file(name: &str, len: usize) -> SelectedFile {
        SelectedFile::new(name, vec![0u8; len]).expect("file")
    }

    fn choices() -> Choices {
        Choices {
            profile_id: ProfileId::new("anycubic_m3"),
            flips: FlipSettings::new(true, false),
        }
    }

    fn ready_record() -> JobRecord {
        let mut record = JobRecord::new();
        record.set_file(FileSlot::Gerber, file("board.gbr", 2048));
        record.set_file(FileSlot::Drill, file("board.drl", 512));
        record
    }

    fn progress(sent: u64, total: u64) -> UploadProgress {
        UploadProgress { sent, total }
    }

    #[test]
    fn missing_files_fail_validation_without_starting() {
        let cases = [
            (None, None),
            (Some(file("board.gbr", 8)), None),
            (None, Some(file("board.drl", 8))),
        ];
        for (gerber, drill) in cases {
            let mut record = JobRecord::new();
            if let Some(gerber) = gerber {
                record.set_file(FileSlot::Gerber, gerber);
            }
            if let Some(drill) = drill {
                record.set_file(FileSlot::Drill, drill);
            }

            let err = record.begin(&choices()).expect_err("not ready");
            assert_eq!(
                err.reason,
                SubmitRejected::NotReady(ValidationIssue::MissingFiles)
            );
            assert_eq!(record.attempt(), 0);
            let failure = record.state().failure().expect("failed state");
            assert_eq!(failure.message(), "Please select both files.");
        }
    }

    #[test]
    fn missing_profile_fails_validation() {
        let mut record = ready_record();
        let err = record.begin(&Choices::default()).expect_err("no profile");
        assert_eq!(
            err.reason,
            SubmitRejected::NotReady(ValidationIssue::MissingProfile)
        );
        assert!(record.state().failure().is_some());
    }

    #[test]
    fn begin_starts_uploading_with_the_choices() {
        let mut record = ready_record();
        let started = record.begin(&choices()).expect("ready");

        assert_eq!(started.attempt, 1);
        assert_eq!(record.state(), &JobState::Uploading { progress: 0 });
        assert_eq!(started.request.gerber.name(), "board.gbr");
        assert_eq!(started.request.profile_id.as_str(), "anycubic_m3");
        assert!(started.request.flips.horizontal);
        assert!(started.superseded.is_none());
    }

    #[test]
    fn second_begin_while_uploading_is_rejected() {
        let mut record = ready_record();
        record.begin(&choices()).expect("ready");
        let err = record.begin(&choices()).expect_err("in flight");
        assert_eq!(err.reason, SubmitRejected::InFlight);
        assert_eq!(record.attempt(), 1);
        assert!(record.state().is_uploading());
    }

    #[test]
    fn progress_never_decreases_and_stays_bounded() {
        let mut record = ready_record();
        let attempt = record.begin(&choices()).expect("ready").attempt;
        let total = 2560;
        let events = [0, 512, 256, 1280, 1280, 3000, 2048];
        let mut seen = Vec::new();
        for sent in events {
            record.record_progress(attempt, progress(sent, total));
            seen.push(record.state().progress());
        }
        assert_eq!(seen, [0, 20, 20, 50, 50, 100, 100]);
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn progress_without_total_is_ignored() {
        let mut record = ready_record();
        let attempt = record.begin(&choices()).expect("ready").attempt;
        assert!(!record.record_progress(attempt, progress(10, 0)));
        assert_eq!(record.state().progress(), 0);
    }

    #[test]
    fn stale_attempts_cannot_touch_the_record() {
        let mut record = ready_record();
        let attempt = record.begin(&choices()).expect("ready").attempt;
        assert!(record.reset().is_none());

        assert!(!record.record_progress(attempt, progress(10, 10)));
        assert!(!record.finish(
            attempt,
            Err(JobFailure::Network {
                reason: "late".into()
            })
        ));
        assert_eq!(record.state(), &JobState::Idle);
    }

    #[test]
    fn reset_clears_everything_from_any_state() {
        let presenter = ResultPresenter::new();

        let mut succeeded = ready_record();
        let attempt = succeeded.begin(&choices()).expect("ready").attempt;
        let artifact = presenter.present(Bytes::from_static(b"png"), Some("board.gbr"));
        assert!(succeeded.finish(attempt, Ok(artifact.clone())));

        let mut failed = ready_record();
        failed.begin(&Choices::default()).expect_err("no profile");

        let mut uploading = ready_record();
        uploading.begin(&choices()).expect("ready");

        let released = succeeded.reset();
        assert_eq!(released, Some(artifact));

        for mut record in [succeeded, failed, uploading, ready_record()] {
            record.reset();
            assert_eq!(record.state(), &JobState::Idle);
            assert_eq!(record.state().progress(), 0);
            assert!(record.file(FileSlot::Gerber).is_none());
            assert!(record.file(FileSlot::Drill).is_none());
            assert!(record.state().artifact().is_none());
            assert!(record.state().failure().is_none());
        }
    }

    #[test]
    fn validation_failure_hands_back_the_shown_result() {
        let presenter = ResultPresenter::new();
        let mut record = ready_record();
        let attempt = record.begin(&choices()).expect("ready").attempt;
        let artifact = presenter.present(Bytes::from_static(b"png"), Some("board.gbr"));
        record.finish(attempt, Ok(artifact.clone()));

        let err = record.begin(&Choices::default()).expect_err("no profile");
        assert_eq!(err.superseded, Some(artifact));
        assert!(record.state().artifact().is_none());
    }

    #[test]
    fn new_files_keep_the_previous_result_until_submit() {
        let presenter = ResultPresenter::new();
        let mut record = ready_record();
        let attempt = record.begin(&choices()).expect("ready").attempt;
        let artifact = presenter.present(Bytes::from_static(b"png"), Some("board.gbr"));
        record.finish(attempt, Ok(artifact.clone()));

        record.set_file(FileSlot::Gerber, file("other.gbr", 4));
        assert_eq!(record.state().artifact(), Some(&artifact));

        let started = record.begin(&choices()).expect("ready");
        assert_eq!(started.superseded, Some(artifact));
        assert_eq!(started.request.gerber.name(), "other.gbr");
    }
}
