//! `CurrentUser` as a handler argument
//!
//! Reuses the user `require_auth` already attached; handlers mounted outside
//! the auth layer authenticate here instead.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::CurrentUser;
use crate::auth::middleware::authenticate;
use crate::core::ServerState;
use crate::utils::AppError;

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }
        let user = authenticate(&state.jwt_service, &parts.headers, &parts.uri)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
