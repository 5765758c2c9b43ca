//! `/auth` endpoints.

use crate::dto::{AuthResponse, TelegramAuthRequest, UserOut};
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{Json, extract::State};

/// `POST /auth/telegram`: exchange WebApp init data for a session.
pub async fn telegram_login(
    State(state): State<AppState>,
    Json(request): Json<TelegramAuthRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let session = state.auth.login(&request.init_data).await?;
    Ok(Json(AuthResponse {
        token: session.token,
        user: session.user.into(),
    }))
}

/// `GET /auth/me`: the signed-in user.
#[allow(clippy::unused_async)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserOut> {
    Json(user.into())
}
