use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Error returned by a Confluent Cloud or Kafka REST endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The HTTP status code.
    pub status_code: StatusCode,
    /// Detailed messages about the error conditions.
    pub messages: Vec<String>,
}

impl ApiError {
    /// Decode the body of a failed response
    ///
    /// Control plane APIs answer with `{"errors": [{"detail": ...}]}`,
    /// Kafka REST answers with `{"error_code": ..., "message": ...}`.
    pub fn from_body(status_code: StatusCode, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct Failure {
            #[serde(default)]
            title: Option<String>,
            #[serde(default)]
            detail: Option<String>,
        }
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Body {
            ControlPlane { errors: Vec<Failure> },
            KafkaRest { message: String },
        }

        let messages = match serde_json::from_slice::<Body>(body) {
            Ok(Body::ControlPlane { errors }) => errors
                .into_iter()
                .filter_map(|failure| failure.detail.or(failure.title))
                .collect(),
            Ok(Body::KafkaRest { message }) => vec![message],
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_owned();
                if text.is_empty() {
                    vec![]
                } else {
                    vec![text]
                }
            }
        };

        Self {
            status_code,
            messages,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.messages.is_empty() {
            write!(f, "status {}", self.status_code)
        } else {
            write!(
                f,
                "{} (status {})",
                self.messages.join(", "),
                self.status_code
            )
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure before a response could be read
    #[error("network error: {0}")]
    Network(String),
    /// Non successful answer from the API
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    /// The API answered 404
    #[error("not found: {0}")]
    NotFound(ApiError),
    /// The response body could not be decoded
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// The `next` link of a paginated listing has no page token
    #[error("could not parse the next page token from {0:?}")]
    PageToken(String),
    #[error("timeout after {timeout:?} while waiting for {resource} to become {target}")]
    Timeout {
        resource: String,
        target: String,
        timeout: Duration,
    },
    #[error("{resource} entered unexpected state {state:?}")]
    UnexpectedState { resource: String, state: String },
    /// The resource reached a failed state, with the reason given by the API
    #[error("{resource} failed: {detail}")]
    Failed { resource: String, detail: String },
    /// A required setting of the provider is missing
    #[error("{0}")]
    Configuration(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_plane_errors_are_decoded() {
        let body = br#"{"errors":[{"id":"1","status":"409","detail":"Environment name already in use"}]}"#;
        let err = ApiError::from_body(StatusCode::CONFLICT, body);
        assert_eq!(err.messages, vec!["Environment name already in use"]);
        assert_eq!(
            err.to_string(),
            "Environment name already in use (status 409 Conflict)"
        );
    }

    #[test]
    fn kafka_rest_errors_are_decoded() {
        let body = br#"{"error_code":40403,"message":"This server does not host this topic-partition."}"#;
        let err = ApiError::from_body(StatusCode::NOT_FOUND, body);
        assert_eq!(
            err.messages,
            vec!["This server does not host this topic-partition."]
        );
    }

    #[test]
    fn raw_bodies_are_kept() {
        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, b"upstream unavailable\n");
        assert_eq!(err.messages, vec!["upstream unavailable"]);

        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(err.to_string(), "status 502 Bad Gateway");
    }
}
