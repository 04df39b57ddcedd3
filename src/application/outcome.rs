//! Classification of transport results into the job's success/failure vocabulary.

use bytes::Bytes;
use serde::Deserialize;
use tracing::warn;

use crate::application::error::JobFailure;
use crate::application::ports::{TransportError, TransportResponse};
use crate::application::presenter::IMAGE_CONTENT_TYPE;

const SUCCESS_STATUS: u16 = 200;

/// Structured failure body. Only a non-empty string `detail` is shown.
#[derive(Debug, Deserialize)]
struct FailureBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl FailureBody {
    fn message(self) -> Option<String> {
        match self.detail? {
            serde_json::Value::String(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

/// Map a finished upload to the image bytes or a terminal failure.
pub fn classify(result: Result<TransportResponse, TransportError>) -> Result<Bytes, JobFailure> {
    let response = match result {
        Ok(response) => response,
        Err(TransportError::Network(reason)) => return Err(JobFailure::Network { reason }),
        Err(TransportError::Request(reason)) => return Err(JobFailure::RequestBuild { reason }),
        Err(TransportError::Body { status, message }) => {
            warn!(status, error = %message, "conversion response body unreadable");
            return Err(JobFailure::MalformedResponse {
                status: Some(status),
            });
        }
    };

    if response.status == SUCCESS_STATUS {
        if response.body.is_empty() {
            return Err(JobFailure::MalformedResponse {
                status: Some(response.status),
            });
        }
        if let Some(content_type) = response.content_type.as_deref()
            && !content_type.starts_with(IMAGE_CONTENT_TYPE)
        {
            warn!(content_type, "conversion succeeded with unexpected content type");
        }
        return Ok(response.body);
    }

    match serde_json::from_slice::<FailureBody>(&response.body)
        .ok()
        .and_then(FailureBody::message)
    {
        Some(detail) => Err(JobFailure::Server {
            status: response.status,
            detail,
        }),
        None => Err(JobFailure::MalformedResponse {
            status: Some(response.status),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static [u8]) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status,
            content_type: None,
            body: Bytes::from_static(body),
        })
    }

    #[test]
    fn ok_with_body_is_success() {
        let bytes = classify(response(200, b"\x89PNG")).expect("success");
        assert_eq!(bytes.as_ref(), b"\x89PNG");
    }

    #[test]
    fn ok_without_body_is_malformed() {
        let failure = classify(response(200, b"")).expect_err("empty body");
        assert_eq!(failure, JobFailure::MalformedResponse { status: Some(200) });
        assert_eq!(failure.message(), "Server error.");
    }

    #[test]
    fn detail_is_used_verbatim() {
        let failure =
            classify(response(422, br#"{"detail":"unsupported drill format"}"#)).expect_err("422");
        assert_eq!(failure.message(), "unsupported drill format");
    }

    #[test]
    fn error_field_is_not_shown() {
        let failure =
            classify(response(500, br#"{"error":"Output file does not exist"}"#)).expect_err("500");
        assert_eq!(failure, JobFailure::MalformedResponse { status: Some(500) });
        assert_eq!(failure.message(), "Server error.");
    }

    #[test]
    fn non_string_detail_falls_back_to_generic_message() {
        let failure = classify(response(
            422,
            br#"{"detail":[{"loc":["body","gerber_file"],"msg":"field required"}]}"#,
        ))
        .expect_err("422");
        assert_eq!(failure, JobFailure::MalformedResponse { status: Some(422) });
        assert_eq!(failure.message(), "Server error.");
    }

    #[test]
    fn unparseable_failure_body_is_generic_server_error() {
        let failure = classify(response(502, b"<html>Bad Gateway</html>")).expect_err("502");
        assert_eq!(failure.message(), "Server error.");
    }

    #[test]
    fn transport_errors_map_to_their_kinds() {
        let network = classify(Err(TransportError::Network("refused".into()))).expect_err("net");
        assert_eq!(network.message(), "Network error.");

        let build = classify(Err(TransportError::Request("bad part".into()))).expect_err("build");
        assert_eq!(build.message(), "Error loading files.");

        let body = classify(Err(TransportError::Body {
            status: 200,
            message: "connection reset".into(),
        }))
        .expect_err("body");
        assert_eq!(body.message(), "Server error.");
    }
}
