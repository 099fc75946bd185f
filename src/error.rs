use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::time::Duration;

const INTERNAL_MESSAGE: &str = "Internal server error. Please contact the administrator.";

// Errors that end a request, rendered as {code, message, status}
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Rate limit exceeded: {limit} calls per {window_secs} seconds.")]
    RateLimited {
        limit: u32,
        window_secs: u64,
        retry_after: Duration,
    },
    #[error("{message}")]
    InvalidRequest { message: String },
    #[error("{message}")]
    PayloadTooLarge { message: String },
    #[error("{message}")]
    Unprocessable { message: String },
    #[error("{message}")]
    Internal { message: String },
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::RateLimited { .. } => "RATE_LIMITED",
            Error::InvalidRequest { .. } => "INVALID_REQUEST",
            Error::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Error::Unprocessable { .. } => "UNPROCESSABLE_REQUEST",
            Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        // the body limit surfaces here, mid-stream, as a multipart error
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Error::PayloadTooLarge {
                message: format!("Upload too large: {}", err.body_text()),
            },
            _ => Error::InvalidRequest {
                message: format!("Invalid multipart body: {}", err.body_text()),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        // internal detail stays in the logs
        let message = match &self {
            Error::Internal { message } => {
                tracing::error!(%message, "request failed");
                INTERNAL_MESSAGE.to_string()
            }
            other => {
                tracing::warn!(code = other.code(), "{other}");
                other.to_string()
            }
        };

        let body = Json(json!({
            "code": self.code(),
            "message": message,
            "status": status.as_u16(),
        }));
        let mut response = (status, body).into_response();

        if let Error::RateLimited { retry_after, .. } = self {
            // round up so clients never retry a hair too early
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Why a single image could not be extracted.
///
/// These never end the batch, the orchestrator turns them into failed outcomes.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("request to extraction backend failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("extraction backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("extraction backend returned no content")]
    EmptyResponse,
    #[error("malformed extraction reply: {0}")]
    Malformed(String),
    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),
    #[error("extraction task aborted: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rate_limited_maps_to_429_with_retry_after() {
        let response = Error::RateLimited {
            limit: 10,
            window_secs: 60,
            retry_after: Duration::from_millis(12_500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "13");
        assert_eq!(
            body_json(response).await,
            json!({
                "code": "RATE_LIMITED",
                "message": "Rate limit exceeded: 10 calls per 60 seconds.",
                "status": 429,
            })
        );
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let response = Error::Internal {
            message: "db password is hunter2".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }
}
