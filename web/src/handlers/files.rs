//! File upload and download.

use super::read_form;
use crate::dto::FileOut;
use crate::error::AppError;
use crate::extractors::CurrentActor;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use helpdesk_core::TicketId;

/// `POST /tickets/{id}/files`: multipart `file`.
pub async fn upload(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<TicketId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileOut>), AppError> {
    let upload = read_form(multipart)
        .await?
        .file
        .ok_or_else(|| AppError::validation("file is required"))?;
    let attachment = state.registry.add_attachment(&actor, id, upload).await?;
    Ok((StatusCode::CREATED, Json(attachment.into())))
}

/// `GET /files/{reference}`: the bytes of a stored attachment.
pub async fn download(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(reference): Path<String>,
) -> Result<Response, AppError> {
    let (attachment, bytes) = state.registry.fetch_attachment(&actor, &reference).await?;

    let disposition = HeaderValue::from_str(&content_disposition(&attachment.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `attachment` disposition with an ASCII fallback name and the exact UTF-8
/// name in `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = urlencoding::encode(filename);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
