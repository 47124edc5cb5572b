use axum::{
    extract::{FromRequestParts, Json, State},
    http::{header, request::Parts, StatusCode},
    response::IntoResponse,
};

use crate::{
    error::{AppError, Result},
    handlers::AppState,
    models::user::{Claims, LoginRequest},
};

/// Any logged-in user, taken from the `Authorization: Bearer` header
pub struct AuthUser(pub Claims);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;

        let claims = state.auth.tokens().verify(token)?;
        Ok(AuthUser(claims))
    }
}

/// A logged-in administrator
pub struct AdminUser(pub Claims);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(AppError::Forbidden("administrator access required".to_string()));
        }
        Ok(AdminUser(claims))
    }
}

/// Handler for username/password login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let response = state.auth.login(&request.username, &request.password).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Profile of the caller
pub async fn me(State(state): State<AppState>, AuthUser(claims): AuthUser) -> Result<impl IntoResponse> {
    let user = state.auth.current_user(&claims).await?;
    Ok((StatusCode::OK, Json(user)))
}
