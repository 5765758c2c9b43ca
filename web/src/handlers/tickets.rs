//! `/tickets` endpoints.

use crate::dto::{ListParams, StatusUpdate, TicketOut, UrgentUpdate};
use crate::error::AppError;
use crate::extractors::CurrentActor;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use helpdesk_core::{Ticket, TicketDraft, TicketId, TicketPatch, TicketStatus};

async fn view(state: &AppState, ticket: Ticket) -> Result<Json<TicketOut>, AppError> {
    let view = state.registry.ticket_view(ticket).await?;
    Ok(Json(view.into()))
}

/// `GET /tickets?filter=all|mine|closed&urgent=bool`
pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TicketOut>>, AppError> {
    let tickets = state
        .registry
        .list(&actor, params.filter, params.urgent)
        .await?;
    let views = state.registry.ticket_views(tickets).await?;
    Ok(Json(views.into_iter().map(TicketOut::from).collect()))
}

/// `POST /tickets`
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(draft): Json<TicketDraft>,
) -> Result<(StatusCode, Json<TicketOut>), AppError> {
    let ticket = state.registry.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, view(&state, ticket).await?))
}

/// `GET /tickets/{id}`
pub async fn get(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<TicketId>,
) -> Result<Json<TicketOut>, AppError> {
    let ticket = state.registry.get(&actor, id).await?;
    view(&state, ticket).await
}

/// `PUT /tickets/{id}`
pub async fn edit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<TicketId>,
    Json(patch): Json<TicketPatch>,
) -> Result<Json<TicketOut>, AppError> {
    let ticket = state.registry.edit(&actor, id, patch).await?;
    view(&state, ticket).await
}

/// `PUT /tickets/{id}/status`
pub async fn change_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<TicketId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<TicketOut>, AppError> {
    let target: TicketStatus = update
        .status
        .parse()
        .map_err(|e: helpdesk_core::status::UnknownStatus| AppError::bad_request(e.to_string()))?;
    let ticket = state.registry.change_status(&actor, id, target).await?;
    view(&state, ticket).await
}

/// `PUT /tickets/{id}/assign`: the caller takes the ticket.
pub async fn assign(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<TicketId>,
) -> Result<Json<TicketOut>, AppError> {
    let ticket = state.registry.assign(&actor, id).await?;
    view(&state, ticket).await
}

/// `PUT /tickets/{id}/urgent`
pub async fn set_urgent(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<TicketId>,
    Json(update): Json<UrgentUpdate>,
) -> Result<Json<TicketOut>, AppError> {
    let ticket = state
        .registry
        .set_urgent(&actor, id, update.is_urgent)
        .await?;
    view(&state, ticket).await
}
