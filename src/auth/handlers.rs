use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        claims::AuthIdentity,
        cookies::{cleared_refresh_cookie, refresh_cookie},
        dto::{AccessTokenResponse, CredentialsRequest, ResetPasswordRequest},
        extractors::{AccessUser, RefreshUser},
        services::IssuedSession,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", get(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Access token in the body, refresh token (when there is a new one) in the cookie.
fn session_response(
    state: &AppState,
    status: StatusCode,
    session: IssuedSession,
) -> Result<Response, AppError> {
    let mut response = (
        status,
        Json(AccessTokenResponse {
            access_token: session.access_token,
        }),
    )
        .into_response();
    if let Some(token) = session.refresh_token {
        let cookie = refresh_cookie(
            &token,
            state.sessions.tokens().refresh_ttl(),
            state.config.cookie.secure,
        );
        response.headers_mut().insert(
            header::SET_COOKIE,
            HeaderValue::from_str(&cookie).context("refresh cookie header")?,
        );
    }
    Ok(response)
}

fn with_cleared_cookie(state: &AppState, response: impl IntoResponse) -> Response {
    let cookie = cleared_refresh_cookie(state.config.cookie.secure);
    ([(header::SET_COOKIE, cookie)], response).into_response()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;
    let session = state
        .sessions
        .register(&payload.email, &payload.password)
        .await?;
    session_response(&state, StatusCode::CREATED, session)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;
    let session = state
        .sessions
        .login(&payload.email, &payload.password)
        .await?;
    session_response(&state, StatusCode::OK, session)
}

#[instrument(skip_all, fields(user_id = %user.identity.id))]
pub async fn refresh(
    State(state): State<AppState>,
    user: RefreshUser,
) -> Result<Response, AppError> {
    let session = state
        .sessions
        .refresh(user.identity.id, Some(user.token.as_str()))
        .await?;
    session_response(&state, StatusCode::OK, session)
}

#[instrument(skip_all, fields(user_id = %user.identity.id))]
pub async fn logout(State(state): State<AppState>, user: AccessUser) -> Response {
    // The cookie goes away whatever the store says.
    match state.sessions.logout(user.identity.id).await {
        Ok(()) => with_cleared_cookie(&state, StatusCode::OK),
        Err(e) => with_cleared_cookie(&state, e),
    }
}

#[instrument(skip_all, fields(user_id = %user.identity.id))]
pub async fn reset_password(
    State(state): State<AppState>,
    user: AccessUser,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Response, AppError> {
    payload.validate()?;
    state
        .sessions
        .reset_password(
            user.identity.id,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;
    Ok(with_cleared_cookie(&state, StatusCode::OK))
}

#[instrument(skip_all, fields(user_id = %user.identity.id))]
pub async fn get_me(user: AccessUser) -> Json<AuthIdentity> {
    Json(user.identity)
}
