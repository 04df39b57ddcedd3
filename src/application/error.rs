use thiserror::Error;

use crate::{config::LoadError, domain::error::DomainError, infra::error::InfraError};

pub const MISSING_FILES_MESSAGE: &str = "Please select both files.";
pub const MISSING_PROFILE_MESSAGE: &str = "Please select a printer.";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error.";
pub const REQUEST_BUILD_MESSAGE: &str = "Error loading files.";

/// What was missing when a submit was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingFiles,
    MissingProfile,
}

/// Why a conversion attempt ended in `Failed`.
///
/// Every variant is terminal for the attempt and recoverable by a fresh submit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFailure {
    #[error("submit precondition not met: {0:?}")]
    Validation(ValidationIssue),
    #[error("no response received: {reason}")]
    Network { reason: String },
    #[error("server rejected conversion (status {status}): {detail}")]
    Server { status: u16, detail: String },
    #[error("response could not be interpreted (status {status:?})")]
    MalformedResponse { status: Option<u16> },
    #[error("conversion request could not be built: {reason}")]
    RequestBuild { reason: String },
}

impl JobFailure {
    /// Human-readable text shown to the user.
    pub fn message(&self) -> &str {
        match self {
            JobFailure::Validation(ValidationIssue::MissingFiles) => MISSING_FILES_MESSAGE,
            JobFailure::Validation(ValidationIssue::MissingProfile) => MISSING_PROFILE_MESSAGE,
            JobFailure::Network { .. } => NETWORK_ERROR_MESSAGE,
            JobFailure::Server { detail, .. } => detail,
            JobFailure::MalformedResponse { .. } => SERVER_ERROR_MESSAGE,
            JobFailure::RequestBuild { .. } => REQUEST_BUILD_MESSAGE,
        }
    }

    /// Stable label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            JobFailure::Validation(_) => "validation",
            JobFailure::Network { .. } => "network",
            JobFailure::Server { .. } => "server",
            JobFailure::MalformedResponse { .. } => "malformed_response",
            JobFailure::RequestBuild { .. } => "request_build",
        }
    }
}

/// Returned by `submit` when no upload was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("a conversion is already uploading")]
    InFlight,
    #[error("conversion inputs are incomplete")]
    NotReady(ValidationIssue),
}

/// Top-level error of the command-line front end.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conversion failed: {0}")]
    Conversion(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_detail_is_shown_verbatim() {
        let failure = JobFailure::Server {
            status: 422,
            detail: "unsupported drill format".to_string(),
        };
        assert_eq!(failure.message(), "unsupported drill format");
        assert_eq!(failure.kind(), "server");
    }

    #[test]
    fn generic_messages_cover_the_rest() {
        assert_eq!(
            JobFailure::Network {
                reason: "connection refused".into()
            }
            .message(),
            "Network error."
        );
        assert_eq!(
            JobFailure::MalformedResponse { status: Some(500) }.message(),
            "Server error."
        );
        assert_eq!(
            JobFailure::Validation(ValidationIssue::MissingFiles).message(),
            "Please select both files."
        );
    }
}
