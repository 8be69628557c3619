use axum::{
    extract::{FromRef, FromRequestParts, MatchedPath, Request, State},
    http::{Method, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    session::{Claims, SessionGuard},
};

/// Path prefix of the admin UI pages.
pub const ADMIN_PREFIX: &str = "/admin";

/// The admin login page; the only admin page reachable without a session.
pub const ADMIN_LOGIN_PATH: &str = "/admin/login";

/// AdminSession
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Claims> for AdminSession {
    fn from(claims: Claims) -> Self {
        Self {
            expires_at: DateTime::from_timestamp(claims.exp as i64, 0).unwrap_or_default(),
            email: claims.email,
        }
    }
}

/// AdminSession Extractor Implementation
///
/// Reuses the session already resolved by [`require_session`] when the handler sits behind
/// it; otherwise verifies the `token` cookie itself. Rejects with `Unauthorized`.
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    SessionGuard: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<AdminSession>() {
            return Ok(session.clone());
        }

        SessionGuard::from_ref(state)
            .session_from_headers(&parts.headers)
            .map(AdminSession::from)
            .ok_or(AppError::Unauthorized)
    }
}

/// Operation
///
/// The document-store operation a protected request is about to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Derives the operation from the method and whether the matched route addresses a
    /// single document (`.../{id}`).
    ///
    /// Every operation requires the same session; the result only labels the log lines of
    /// [`require_session`]. Per-operation rules would hook in here.
    pub fn classify(method: &Method, matched_path: Option<&str>) -> Self {
        let single = matched_path.is_some_and(|path| path.ends_with("{id}"));
        match *method {
            Method::POST => Operation::Create,
            Method::PUT | Method::PATCH => Operation::Update,
            Method::DELETE => Operation::Delete,
            _ if single => Operation::Read,
            _ => Operation::List,
        }
    }
}

/// require_session
///
/// Route layer guarding every protected handler. Runs before the handler and before its
/// body is extracted, so an unauthenticated request never reaches the document store.
/// On success the resolved [`AdminSession`] is stored in the request extensions.
pub async fn require_session(
    State(sessions): State<SessionGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let operation = Operation::classify(
        request.method(),
        request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str),
    );

    let Some(claims) = sessions.session_from_headers(request.headers()) else {
        tracing::warn!(?operation, uri = %request.uri(), "rejected request without a valid session");
        return Err(AppError::Unauthorized);
    };

    tracing::debug!(?operation, admin = %claims.email, "session verified");
    request.extensions_mut().insert(AdminSession::from(claims));
    Ok(next.run(request).await)
}

/// admin_page_filter
///
/// Redirects browser navigation under `/admin` to the login page when the session cookie
/// does not verify. This is a convenience for the admin UI; the API routes enforce
/// authentication on their own through [`require_session`].
pub async fn admin_page_filter(
    State(sessions): State<SessionGuard>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    let gated = is_admin_page(path) && !is_login_page(path);

    if gated && sessions.session_from_headers(request.headers()).is_none() {
        tracing::debug!(path, "redirecting unauthenticated admin navigation");
        return Redirect::to(ADMIN_LOGIN_PATH).into_response();
    }

    next.run(request).await
}

fn is_admin_page(path: &str) -> bool {
    path == ADMIN_PREFIX
        || path
            .strip_prefix(ADMIN_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn is_login_page(path: &str) -> bool {
    path == ADMIN_LOGIN_PATH
        || path
            .strip_prefix(ADMIN_LOGIN_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}
