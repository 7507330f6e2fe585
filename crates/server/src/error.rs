use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The converter could not be started or exited with a failure.
    /// The message is sent to the client as is.
    #[error("{0}")]
    Conversion(String),

    #[error("converter did not finish within {0} s")]
    ConversionTimeout(u64),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("invalid process data: {0}")]
    ProcessData(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Multipart(e) => e.status(),
            ServerError::Conversion(_)
            | ServerError::ConversionTimeout(_)
            | ServerError::Config(_)
            | ServerError::Io(_)
            | ServerError::ProcessData(_)
            | ServerError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("{status}: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_message_is_raw() {
        let err = ServerError::Conversion("Command failed: x\nboom".into());
        assert_eq!(err.to_string(), "Command failed: x\nboom");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(ServerError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::NotFound("model 'a'".into()).to_string(),
            "model 'a' not found"
        );
    }
}
