/// HTTP error surface for holdem_web
///
/// - A single JSON error body for every endpoint
/// - Status code mapping for engine errors
/// - Severity-based logging
use holdem_engine::errors::{GameError, InvalidAction};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::{Rejection, Reply};

/// Standard error response format for all API endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "game_not_found")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Error classification for logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 4xx: the caller did something the table does not allow
    Client,
    /// 5xx: needs investigation
    Server,
}

/// Conversion of errors into logged HTTP responses
pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        match self.error_details() {
            Some(details) => {
                ErrorResponse::with_details(self.error_code(), self.error_message(), details)
            }
            None => ErrorResponse::new(self.error_code(), self.error_message()),
        }
    }

    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let body = self.to_error_response();
        match self.severity() {
            ErrorSeverity::Client => tracing::info!(
                status = status.as_u16(),
                error = %body.error,
                message = %body.message,
                "request rejected"
            ),
            ErrorSeverity::Server => tracing::error!(
                status = status.as_u16(),
                error = %body.error,
                message = %body.message,
                "request failed"
            ),
        }
        body.into_response(status)
    }
}

impl IntoErrorResponse for GameError {
    fn status_code(&self) -> StatusCode {
        match self {
            GameError::GameNotFound(_) | GameError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            GameError::RoomFull { .. } | GameError::NameTaken(_) | GameError::AlreadySeated(_) => {
                StatusCode::CONFLICT
            }
            GameError::NotYourTurn => StatusCode::FORBIDDEN,
            GameError::InvalidAction(InvalidAction::HandInProgress) => StatusCode::CONFLICT,
            GameError::InvalidAction(_) => StatusCode::BAD_REQUEST,
            GameError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            GameError::GameNotFound(_) => "game_not_found",
            GameError::PlayerNotFound(_) => "player_not_found",
            GameError::RoomFull { .. } => "room_full",
            GameError::NameTaken(_) => "name_taken",
            GameError::AlreadySeated(_) => "already_seated",
            GameError::NotYourTurn => "not_your_turn",
            GameError::InvalidAction(_) => "invalid_action",
            GameError::StoragePoisoned => "storage_poisoned",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            GameError::GameNotFound(code) => Some(serde_json::json!({ "code": code })),
            GameError::RoomFull { max } => Some(serde_json::json!({ "max_players": max })),
            GameError::InvalidAction(InvalidAction::BelowMinimumRaise { amount, minimum }) => {
                Some(serde_json::json!({ "amount": amount, "minimum": minimum }))
            }
            _ => None,
        }
    }
}

/// Turn warp rejections (unknown routes, malformed bodies) into the common
/// JSON error body.
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, code, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "no such route".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "bad_request", err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, "bad_request", err.to_string())
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "length_required",
            "request body needs a content-length".to_string(),
        )
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "request body too large".to_string(),
        )
    } else if rejection.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "unsupported_media_type",
            "expected application/json".to_string(),
        )
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed".to_string(),
        )
    } else {
        tracing::error!(?rejection, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error".to_string(),
        )
    };
    Ok(ErrorResponse::new(code, message).into_response(status))
}
