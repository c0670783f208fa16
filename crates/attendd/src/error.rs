use crate::engine::EngineError;
use crate::reference::LookupError;
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const MISSING_FIELDS: &str = "Employee ID and image are required";
pub const INVALID_EMPLOYEE_ID: &str = "Invalid employee ID";
pub const NOT_ENROLLED: &str = "Employee face not added yet!";
pub const IMAGE_NOT_FOUND: &str = "Employee face image not found";

/// Failure of a `/recognize_face` request.
///
/// `Display` is the error-log line; [`IntoResponse`] renders the body the
/// caller sees.
#[derive(Error, Debug)]
pub enum RecognizeError {
    #[error("Employee ID and image are required")]
    MissingFields,
    #[error("Invalid employee ID: {0}")]
    InvalidEmployeeId(String),
    #[error("Malformed upload: {message}")]
    MalformedUpload { status: StatusCode, message: String },
    #[error("Folder not found for employee_id: {0}")]
    NotEnrolled(String),
    #[error("Employee face image not found for employee_id: {0}")]
    ImageNotFound(String),
    #[error("Error: {0}")]
    Internal(String),
}

impl RecognizeError {
    pub fn status(&self) -> StatusCode {
        match self {
            RecognizeError::MissingFields | RecognizeError::InvalidEmployeeId(_) => {
                StatusCode::BAD_REQUEST
            }
            RecognizeError::MalformedUpload { status, .. } => *status,
            RecognizeError::NotEnrolled(_) | RecognizeError::ImageNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            RecognizeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned in the `error` field of the response body.
    pub fn public_message(&self) -> String {
        match self {
            RecognizeError::MissingFields => MISSING_FIELDS.to_string(),
            RecognizeError::InvalidEmployeeId(_) => INVALID_EMPLOYEE_ID.to_string(),
            RecognizeError::MalformedUpload { message, .. } => message.clone(),
            RecognizeError::NotEnrolled(_) => NOT_ENROLLED.to_string(),
            RecognizeError::ImageNotFound(_) => IMAGE_NOT_FOUND.to_string(),
            RecognizeError::Internal(text) => text.clone(),
        }
    }
}

impl From<MultipartError> for RecognizeError {
    fn from(err: MultipartError) -> Self {
        RecognizeError::MalformedUpload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<LookupError> for RecognizeError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotEnrolled(id) => RecognizeError::NotEnrolled(id),
            LookupError::ImageNotFound(id) => RecognizeError::ImageNotFound(id),
            other @ LookupError::Io { .. } => RecognizeError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for RecognizeError {
    fn from(err: EngineError) -> Self {
        RecognizeError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for RecognizeError {
    fn from(err: std::io::Error) -> Self {
        RecognizeError::Internal(err.to_string())
    }
}

impl IntoResponse for RecognizeError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}
