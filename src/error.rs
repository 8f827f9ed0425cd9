use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eink_frame::RasterError;
use serde_json::json;
use thiserror::Error;

use crate::panel::{BusError, PanelError};
use crate::services::decoder::DecodeError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] DecodeError),

    #[error("Missing multipart field: {0}")]
    MissingField(&'static str),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Upload exceeds {max} bytes")]
    PayloadTooLarge { max: usize },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a render cycle did not put the image on the panel.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Invalid input image: {0}")]
    Input(#[from] RasterError),

    #[error("Bus error: {0}")]
    Bus(BusError),

    #[error("Panel refresh did not complete within {timeout_ms} ms")]
    RefreshTimeout { timeout_ms: u64 },

    #[error("Display busy: waited {waited_ms} ms in queue")]
    ConcurrencyTimeout { waited_ms: u64 },

    #[error("Panel error: {0}")]
    Panel(PanelError),

    #[error("Render worker failed: {message}")]
    Worker { hardware: bool, message: String },
}

impl RenderError {
    /// True when the panel may have been left in an unknown state.
    pub fn hardware_touched(&self) -> bool {
        match self {
            RenderError::Input(_) | RenderError::ConcurrencyTimeout { .. } => false,
            RenderError::Bus(_) | RenderError::RefreshTimeout { .. } => true,
            RenderError::Panel(e) => !matches!(
                e,
                PanelError::InvalidState { .. } | PanelError::FrameSize { .. }
            ),
            RenderError::Worker { hardware, .. } => *hardware,
        }
    }
}

impl From<PanelError> for RenderError {
    fn from(e: PanelError) -> Self {
        match e {
            PanelError::Bus(e) => RenderError::Bus(e),
            PanelError::RefreshTimeout { timeout_ms } => RenderError::RefreshTimeout { timeout_ms },
            other => RenderError::Panel(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidImage(_) | ApiError::MissingField(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Render(RenderError::Input(_)) => StatusCode::BAD_REQUEST,
            ApiError::Render(RenderError::ConcurrencyTimeout { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "status": status.as_u16(),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_missing_field() {
        let error = ApiError::MissingField("file");
        assert_eq!(error.to_string(), "Missing multipart field: file");
    }

    #[test]
    fn test_api_error_payload_too_large() {
        let error = ApiError::PayloadTooLarge { max: 1024 };
        assert_eq!(error.to_string(), "Upload exceeds 1024 bytes");
    }

    #[test]
    fn test_api_error_unsupported_media_type() {
        let error = ApiError::UnsupportedMediaType("image/jpeg".to_string());
        assert_eq!(error.to_string(), "Unsupported media type: image/jpeg");
    }

    #[test]
    fn test_render_error_concurrency_timeout() {
        let error = RenderError::ConcurrencyTimeout { waited_ms: 120_000 };
        assert_eq!(error.to_string(), "Display busy: waited 120000 ms in queue");
    }

    #[test]
    fn test_render_error_from_panel_error() {
        let error: RenderError = PanelError::RefreshTimeout { timeout_ms: 60_000 }.into();
        assert!(matches!(
            error,
            RenderError::RefreshTimeout { timeout_ms: 60_000 }
        ));

        let error: RenderError = PanelError::Bus(BusError::Write("nak".to_string())).into();
        assert!(matches!(error, RenderError::Bus(_)));

        let error: RenderError = PanelError::BusyTimeout {
            phase: "power on",
            waited_ms: 5000,
        }
        .into();
        assert!(matches!(error, RenderError::Panel(_)));
    }

    #[test]
    fn test_hardware_touched() {
        assert!(!RenderError::Input(RasterError::ZeroArea {
            width: 0,
            height: 1
        })
        .hardware_touched());
        assert!(!RenderError::ConcurrencyTimeout { waited_ms: 1 }.hardware_touched());
        assert!(RenderError::RefreshTimeout { timeout_ms: 1 }.hardware_touched());
        assert!(RenderError::Bus(BusError::BusyRead("gone".to_string())).hardware_touched());
        assert!(!RenderError::Panel(PanelError::FrameSize {
            expected: 2,
            actual: 1
        })
        .hardware_touched());
        assert!(RenderError::Worker {
            hardware: true,
            message: "panicked".to_string()
        }
        .hardware_touched());
    }

    #[test]
    fn test_api_error_into_response_status_codes() {
        use axum::response::IntoResponse;

        let response = ApiError::MissingField("file").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::InvalidImage(DecodeError::UnknownFormat).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::UnsupportedMediaType("text/plain".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let response = ApiError::PayloadTooLarge { max: 10 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // queue timeout -> SERVICE_UNAVAILABLE
        let response =
            ApiError::Render(RenderError::ConcurrencyTimeout { waited_ms: 5 }).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        // hardware failure -> INTERNAL_SERVER_ERROR
        let response =
            ApiError::Render(RenderError::RefreshTimeout { timeout_ms: 5 }).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError::Render(RenderError::Input(RasterError::ZeroArea {
            width: 0,
            height: 0,
        }))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::Internal("error".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
