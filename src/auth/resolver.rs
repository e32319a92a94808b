use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;

use crate::auth::token::{TokenError, TokenService};
use crate::database::models::User;
use crate::database::{users, StoreError};
use crate::error::ApiError;
use crate::state::AppState;

/// Why a request could not be tied to an active principal. Each variant maps
/// to a distinct wire-level error so clients can tell "no credential" from
/// "bad credential" from "account disabled".
#[derive(Debug)]
pub enum AuthError {
    MissingCredential,
    CredentialInvalid(TokenError),
    PrincipalNotFound,
    PrincipalInactive,
    Backend(StoreError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "no bearer credential supplied"),
            AuthError::CredentialInvalid(e) => write!(f, "credential rejected: {}", e),
            AuthError::PrincipalNotFound => write!(f, "token subject does not exist"),
            AuthError::PrincipalInactive => write!(f, "account is inactive"),
            AuthError::Backend(e) => write!(f, "principal lookup failed: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

/// The authenticated principal for the current request, injected into
/// request extensions by [`require_auth`]. Looked up fresh per request,
/// never cached across requests.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Principal id echoed into response extensions so the logging stage and the
/// boundary responder can record who the request ran as.
#[derive(Clone, Copy, Debug)]
pub struct PrincipalId(pub i64);

/// Resolve the request's bearer token to an active principal.
///
/// State order: bearer extraction, token verification, subject lookup,
/// active-status check. Each failure is terminal.
pub async fn resolve(
    headers: &HeaderMap,
    tokens: &TokenService,
    pool: &SqlitePool,
) -> Result<User, AuthError> {
    let token = extract_bearer(headers).ok_or(AuthError::MissingCredential)?;

    let subject = tokens.verify(&token).map_err(AuthError::CredentialInvalid)?;

    let user = users::find_by_username(pool, &subject)
        .await
        .map_err(AuthError::Backend)?
        .ok_or(AuthError::PrincipalNotFound)?;

    if !user.is_active {
        return Err(AuthError::PrincipalInactive);
    }
    Ok(user)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Authentication middleware for protected routes: resolves the principal,
/// makes it available to handlers, and tags the response with its id.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve(request.headers(), &state.tokens, &state.pool).await?;
    let principal_id = user.id;
    request.extensions_mut().insert(CurrentUser(user));

    let mut response = next.run(request).await;
    response.extensions_mut().insert(PrincipalId(principal_id));
    Ok(response)
}
