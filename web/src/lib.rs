//! HTTP boundary of the helpdesk.
//!
//! The imperative shell around the ticket registry: request parsing, bearer
//! authentication, response serialization and the mapping of domain errors to
//! status codes. No ticket rule lives here.
//!
//! # Request Flow
//!
//! 1. **Correlate**: tag the request with an `X-Correlation-ID` span
//! 2. **Authenticate**: resolve the bearer token to an [`Actor`](helpdesk_core::Actor)
//! 3. **Dispatch**: call the matching [`TicketRegistry`](helpdesk_runtime::TicketRegistry) operation
//! 4. **Render**: turn the result into JSON, or the error into [`AppError`]
//!
//! Unknown routes answer exactly like an access denial.
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::new(registry, Arc::new(authenticator));
//! let app = helpdesk_web::router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use error::AppError;
pub use extractors::{Bearer, CurrentActor, CurrentUser};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId};
pub use state::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use handlers::{auth, files, health, messages, tickets};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit();

    let mut routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/auth/telegram", post(auth::telegram_login))
        .route("/auth/me", get(auth::me))
        .route("/tickets", get(tickets::list).post(tickets::create))
        .route("/tickets/:id", get(tickets::get).put(tickets::edit))
        .route("/tickets/:id/status", put(tickets::change_status))
        .route("/tickets/:id/assign", put(tickets::assign))
        .route("/tickets/:id/urgent", put(tickets::set_urgent))
        .route(
            "/tickets/:id/messages",
            get(messages::list).post(messages::send),
        )
        .route("/tickets/:id/files", post(files::upload))
        .route("/files/*reference", get(files::download));
    if state.metrics.is_some() {
        routes = routes.route("/metrics", get(health::metrics));
    }

    routes
        .fallback(middleware::deny_unknown_route)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(middleware::correlation_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
