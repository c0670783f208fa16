use crate::error::RecognizeError;
use crate::startup::AppState;
use attend_core::VerificationResult;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const RECOGNIZED: &str = "Face recognized successfully";
pub const NOT_RECOGNIZED: &str = "Face not recognized";

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "attendd",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Terminal outcome of a verification that ran to completion.
enum Recognition {
    Recognized {
        employee_id: String,
        result: VerificationResult,
    },
    NotRecognized {
        employee_id: String,
    },
}

impl IntoResponse for Recognition {
    fn into_response(self) -> Response {
        match self {
            Recognition::Recognized { employee_id, result } => (
                StatusCode::OK,
                Json(json!({
                    "message": RECOGNIZED,
                    "employee_id": employee_id,
                    "verification_result": result,
                })),
            )
                .into_response(),
            Recognition::NotRecognized { .. } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": NOT_RECOGNIZED })),
            )
                .into_response(),
        }
    }
}

/// `POST /recognize_face`: compare an uploaded photo with the employee's reference image.
pub async fn recognize_face(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match recognize(&state, multipart).await {
        Ok(Recognition::NotRecognized { employee_id }) => {
            tracing::info!(%employee_id, "face not recognized");
            state
                .error_log
                .record(&format!("Face not recognized for employee_id: {employee_id}"));
            Recognition::NotRecognized { employee_id }.into_response()
        }
        Ok(recognized) => recognized.into_response(),
        Err(err) => {
            tracing::error!(status = %err.status(), error = %err, "recognize_face failed");
            state.error_log.record(&err.to_string());
            err.into_response()
        }
    }
}

async fn recognize(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Recognition, RecognizeError> {
    let (employee_id, image) = read_upload(multipart).await?;
    if !is_safe_employee_id(&employee_id) {
        return Err(RecognizeError::InvalidEmployeeId(employee_id));
    }

    // Removed from disk when `staged` drops, on every return path below
    let staged = state.staging.stage(&employee_id, &image).await?;
    let reference = state.gallery.resolve(&employee_id).await?;

    tracing::info!(
        %employee_id,
        reference = %reference.display(),
        size = image.len(),
        "verifying face"
    );

    let result = state
        .engine
        .verify(staged.path().to_path_buf(), reference, state.config.verify_options())
        .await?;
    drop(staged);

    if result.verified {
        tracing::info!(%employee_id, distance = result.distance, "face recognized");
        Ok(Recognition::Recognized { employee_id, result })
    } else {
        Ok(Recognition::NotRecognized { employee_id })
    }
}

/// Pull `employee_id` and `image` out of the form. Other fields are ignored;
/// empty values count as missing.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(String, Bytes), RecognizeError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(%rejection, "request body is not multipart");
        RecognizeError::MissingFields
    })?;

    let mut employee_id: Option<String> = None;
    let mut image: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                let bytes = field.bytes().await?;
                image = Some(bytes).filter(|b| !b.is_empty());
            }
            Some("employee_id") => {
                let text = field.text().await?;
                employee_id = Some(text).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    match (employee_id, image) {
        (Some(id), Some(bytes)) => Ok((id, bytes)),
        _ => Err(RecognizeError::MissingFields),
    }
}

/// Employee ids name a directory under the reference root, so they must be a
/// single plain path segment.
fn is_safe_employee_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
