//! Photo framing endpoint
//!
//! POST a multipart `photo` (jpg/jpeg/png). The photo is classified, framed
//! with the matching artwork and published; the response carries its URL.

use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{MethodRouter, post},
};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;

use crate::AppState;
use crate::constants::{ALLOWED_EXTENSIONS, PHOTO_FIELD};
use crate::models::{ProcessPhotoResponse, Verdict};
use crate::services::classifier::{classify_or_default, mime_type_of};
use crate::services::error::{ApiError, LogErr};
use crate::storage::{self, OUTPUT_CONTENT_TYPE};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", photo_route())
        .route("/process_photo", photo_route())
}

fn photo_route() -> MethodRouter<Arc<AppState>> {
    post(process_photo)
        .options(preflight)
        .fallback(method_not_allowed)
}

/// CORS preflight
async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_MAX_AGE, "3600"),
        ],
    )
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

struct Upload {
    file_name: String,
    data: Bytes,
}

/// Pull the `photo` file out of the form, ignoring anything else.
/// A `photo` part without a filename is a plain form value, not a file.
async fn read_photo_field(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Multipart field error: {}", e);
        ApiError::InvalidUpload(e.body_text())
    })? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            tracing::debug!("Skipping photo field without a filename");
            continue;
        };
        let data = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read photo bytes: {}", e);
            ApiError::InvalidUpload(e.body_text())
        })?;

        return Ok(Upload { file_name, data });
    }

    Err(ApiError::MissingPhoto)
}

pub fn has_allowed_extension(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// POST / - classify, frame and publish a photo
async fn process_photo(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessPhotoResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!("Request is not a multipart form: {}", e);
        ApiError::MissingPhoto
    })?;

    let upload = read_photo_field(&mut multipart).await?;
    if !has_allowed_extension(&upload.file_name) {
        tracing::warn!(file_name = %upload.file_name, "Rejected upload with invalid file type");
        return Err(ApiError::InvalidFileType);
    }

    let data = upload.data.clone();
    let photo = tokio::task::spawn_blocking(move || {
        image::load_from_memory(&data).map(|img| img.to_rgb8())
    })
    .await
    .log_500("Decode task failed")?
    .log_500("Error decoding photo")?;

    tracing::info!(
        file_name = %upload.file_name,
        "Photo received: {}x{} pixels",
        photo.width(),
        photo.height()
    );

    let classification = classify_or_default(
        state.classifier.as_ref(),
        &upload.data,
        mime_type_of(&upload.data),
    )
    .await;
    let verdict = classification.verdict;
    match verdict {
        Verdict::Yes => tracing::info!("Software related issue detected"),
        Verdict::No => tracing::info!("No software related issue detected"),
    }

    let frames = state.frames.clone();
    let encoded = tokio::task::spawn_blocking(move || {
        let framed = frames.frame_or_original(photo, verdict);
        storage::encode_jpeg(&framed)
    })
    .await
    .log_500("Framing task failed")?
    .log_500("Error encoding framed photo")?;

    let key = storage::storage_key(Utc::now(), verdict);
    let image_url = state
        .publisher
        .publish(&key, Bytes::from(encoded), OUTPUT_CONTENT_TYPE)
        .await
        .log_500("Error uploading framed photo")?;

    Ok(Json(ProcessPhotoResponse {
        success: true,
        image_url,
        frame_style: verdict,
        analysis_result: classification.reply,
        message: format!("Photo processed successfully with {} frame", verdict),
    }))
}
