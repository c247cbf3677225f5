//! Bearer-token auth middleware
//!
//! Verifies the HS256 JWT on protected routes and injects the caller as an
//! [`AuthUser`] request extension.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use leadmag_core::{AppError, AuthUser};
use std::sync::Arc;

use crate::auth::jwt;
use crate::error::HttpAppError;

#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Invalid authorization header format".to_string(),
            ))
            .into_response();
        }
    };

    let user: AuthUser = match jwt::validate_token(token, &auth_state.jwt_secret) {
        Ok(user) => user,
        Err(e) => return HttpAppError(e).into_response(),
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}
