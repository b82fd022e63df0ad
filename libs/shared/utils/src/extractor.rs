use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use shared_models::auth::{AuthContext, User};
use shared_models::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

// Middleware that turns the session headers into an AuthContext. Requests without
// a user id are let through as anonymous; handlers decide whether that is enough.
pub async fn session_middleware(mut request: Request<Body>, next: Next) -> Response {
    let auth = auth_context_from_headers(request.headers());
    debug!("Session resolved, authenticated={}", auth.is_authenticated());

    request.extensions_mut().insert(auth);
    next.run(request).await
}

pub fn auth_context_from_headers(headers: &HeaderMap) -> AuthContext {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    match header_value(USER_ID_HEADER) {
        Some(id) => {
            let name = header_value(USER_NAME_HEADER).unwrap_or_else(|| id.clone());
            AuthContext::signed_in(User { id, name, email: None })
        }
        None => AuthContext::anonymous(),
    }
}

/// Returns the signed-in user or an error carrying the login redirect.
pub fn require_user<'a>(auth: &'a AuthContext, login_path: &str) -> Result<&'a User, AppError> {
    auth.user.as_ref().ok_or_else(|| AppError::AuthRequired {
        redirect_to: login_path.to_string(),
    })
}
