//! Request handlers for the HTTP façade

use super::pages;
use super::AppState;
use crate::pipeline::{DispatchRequest, Mode, Workflow};
use crate::session::SessionStore;
use axum::extract::State;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Form body of `POST /response`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseForm {
    /// Free-text question
    #[serde(rename = "userInput", default)]
    pub user_input: String,
    /// `analyze` or `followup`; anything else means analyze
    #[serde(default)]
    pub mode: String,
    /// Workflow name; anything else means community
    #[serde(default)]
    pub workflow: String,
}

impl ResponseForm {
    fn into_request(self) -> DispatchRequest {
        DispatchRequest {
            mode: Mode::parse_lenient(&self.mode),
            workflow: Workflow::parse_lenient(&self.workflow),
            text: self.user_input,
        }
    }
}

/// Body of `POST /reset`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetResponse {
    pub status: String,
    pub message: String,
}

impl ResetResponse {
    fn cleared() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Conversation context cleared.".to_string(),
        }
    }
}

/// Find the session id in the `Cookie` header
///
/// Only well-formed UUIDs are accepted, so a forged cookie cannot name an
/// arbitrary session key.
pub fn session_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| uuid::Uuid::parse_str(value).is_ok())
        .map(str::to_string)
}

/// `Set-Cookie` value binding the browser to `session_id`
pub fn session_cookie(cookie_name: &str, session_id: &str) -> String {
    format!("{}={}; HttpOnly; Path=/; SameSite=Lax", cookie_name, session_id)
}

/// Existing session id, or a fresh one plus the cookie to set
fn resolve_session(state: &AppState, headers: &HeaderMap) -> (String, Option<String>) {
    match session_from_headers(headers, &state.cookie_name) {
        Some(id) => (id, None),
        None => {
            let id = SessionStore::new_session_id();
            debug!(session = %id, "Issuing new session");
            let cookie = session_cookie(&state.cookie_name, &id);
            (id, Some(cookie))
        }
    }
}

fn with_cookie(mut response: Response, cookie: Option<String>) -> Response {
    if let Some(cookie) = cookie {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().insert(SET_COOKIE, value);
            }
            Err(e) => warn!("Session cookie is not a valid header value: {}", e),
        }
    }
    response
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// `GET /<page>`
pub async fn page(state: Arc<AppState>, name: &'static str) -> Response {
    if let Some(dir) = &state.pages_dir {
        let path = dir.join(format!("{}.html", name));
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => return Html(html).into_response(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No page override at {}", path.display());
            }
            Err(e) => {
                error!("Failed to read page {}: {}", path.display(), e);
                return internal_error();
            }
        }
    }
    Html(pages::render(name)).into_response()
}

/// `POST /response`
pub async fn response(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ResponseForm>,
) -> Response {
    let (session_id, cookie) = resolve_session(&state, &headers);
    let request = form.into_request();

    let response = match state.dispatcher.respond(&session_id, &request).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => {
            error!(session = %session_id, "Request failed: {:#}", e);
            internal_error()
        }
    };
    with_cookie(response, cookie)
}

/// `POST /reset`
pub async fn reset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (session_id, cookie) = resolve_session(&state, &headers);
    state.dispatcher.sessions().reset(&session_id).await;
    debug!(session = %session_id, "Conversation reset");
    with_cookie(
        (StatusCode::OK, Json(ResetResponse::cleared())).into_response(),
        cookie,
    )
}
