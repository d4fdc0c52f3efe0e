//! Request authentication
//!
//! `/api/*` requires a bearer token; `/health` and CORS preflights pass
//! through. The admin gate sits behind the auth layer on `/api/admin`.
//!
//! | Failure | Code | Status |
//! |---------|------|--------|
//! | no `Authorization` header | `NotAuthenticated` | 401 |
//! | not a bearer header / bad token | `TokenInvalid` | 401 |
//! | expired token | `TokenExpired` | 401 |
//! | customer on an admin route | `AdminRequired` | 403 |

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::{HeaderMap, Method, Uri, header::AUTHORIZATION};

use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;
use crate::utils::{AppError, ErrorCode};

/// Paths that never carry a token
fn is_public(method: &Method, uri: &Uri) -> bool {
    *method == Method::OPTIONS || !uri.path().starts_with("/api/")
}

/// Resolve the caller from the `Authorization` header
pub(crate) fn authenticate(
    jwt: &JwtService,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<CurrentUser, AppError> {
    let Some(header) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) else {
        security_log!("WARN", "auth_missing", path = uri.path());
        return Err(AppError::unauthorized());
    };
    let token = JwtService::extract_from_header(header)
        .ok_or_else(|| AppError::invalid_token("Expected a bearer token"))?;

    jwt.validate_token(token).map(CurrentUser::from).map_err(|e| {
        security_log!("WARN", "auth_failed", path = uri.path(), error = e.to_string());
        match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })
}

/// Attach [`CurrentUser`] to every `/api/*` request
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_public(req.method(), req.uri()) {
        return Ok(next.run(req).await);
    }

    let user = authenticate(&state.jwt_service, req.headers(), req.uri())?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Reject non-admin callers; layered after [`require_auth`]
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let Some(user) = req.extensions().get::<CurrentUser>() else {
        return Err(AppError::unauthorized());
    };
    if !user.is_admin() {
        security_log!(
            "WARN",
            "admin_required",
            user_id = user.id.as_str(),
            role = user.role.as_str(),
            path = req.uri().path()
        );
        return Err(AppError::new(ErrorCode::AdminRequired));
    }
    Ok(next.run(req).await)
}
