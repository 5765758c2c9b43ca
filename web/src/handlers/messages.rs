//! `/tickets/{id}/messages` endpoints.

use super::read_form;
use crate::dto::MessageOut;
use crate::error::AppError;
use crate::extractors::CurrentActor;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use helpdesk_core::TicketId;

/// `GET /tickets/{id}/messages`: the conversation, oldest first.
pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<TicketId>,
) -> Result<Json<Vec<MessageOut>>, AppError> {
    let messages = state.registry.list_messages(&actor, id).await?;
    Ok(Json(messages.into_iter().map(MessageOut::from).collect()))
}

/// `POST /tickets/{id}/messages`: multipart `text` with an optional `file`.
pub async fn send(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<TicketId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MessageOut>), AppError> {
    let form = read_form(multipart).await?;
    let text = form
        .text
        .ok_or_else(|| AppError::validation("text is required"))?;
    let message = state
        .registry
        .send_message(&actor, id, text, form.file)
        .await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}
