use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use taskstash::Error;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Adapter turning a catalog [`Error`] into an HTTP response.
///
/// Caller mistakes map to `4xx`. Backend and lifecycle failures map to `5xx`
/// so clients can tell "no such record" apart from "could not ask".
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation { .. } | Error::Parse { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::StoreUnavailable(_) | Error::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::ChannelError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        #[cfg(feature = "tracing")]
        {
            if status.is_server_error() {
                tracing::warn!("Request failed: {}", self.0);
            } else {
                tracing::debug!("Request rejected: {}", self.0);
            }
        }

        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskstash::{RecordId, StoreError};

    fn status_of(err: Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn client_errors_are_4xx() {
        let parse = Error::Parse {
            input: "abc".to_string(),
            reason: "invalid digit".to_string(),
        };
        assert!(parse.is_client_error());
        assert_eq!(status_of(parse), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(Error::Validation {
                reason: "title must not be empty".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::NotFound {
                id: RecordId::new(9)
            }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn backend_and_lifecycle_errors_are_5xx() {
        let unavailable = Error::StoreUnavailable(StoreError::Unavailable {
            context: "throttled".to_string(),
        });
        assert!(!unavailable.is_client_error());
        assert_eq!(status_of(unavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(Error::ServiceShutdown),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(Error::Timeout {
                id: RecordId::new(3)
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(Error::ChannelError {
                context: "reply dropped".to_string()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
