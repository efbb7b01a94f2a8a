//! HTTP façade
//!
//! Routes:
//! - `GET /`, `/about`, `/community`, `/academic`, `/consumer`, `/government`
//! - `POST /response` (form: `userInput`, `mode`, `workflow`)
//! - `POST /reset`
//! - `GET /response_log/*` (rendered charts)

mod handlers;
mod pages;

pub use handlers::{session_cookie, session_from_headers, ResponseForm, ResetResponse};

use crate::error::{EcoOptimaError, Result};
use crate::pipeline::Dispatcher;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for all handlers
pub struct AppState {
    /// Request dispatcher (owns the session store)
    pub dispatcher: Dispatcher,
    /// Session cookie name
    pub cookie_name: String,
    /// Directory holding `<page>.html` overrides
    pub pages_dir: Option<PathBuf>,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let log_root = state.dispatcher.log_root().to_path_buf();

    let mut app = Router::new();
    for page in pages::PAGES {
        let route = if page.name == "index" {
            "/".to_string()
        } else {
            format!("/{}", page.name)
        };
        let name = page.name;
        app = app.route(
            &route,
            get(move |State(state): State<Arc<AppState>>| handlers::page(state, name)),
        );
    }

    app.route("/response", post(handlers::response))
        .route("/reset", post(handlers::reset))
        .nest_service("/response_log", ServeDir::new(log_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `bind` and serve until Ctrl-C
///
/// # Errors
///
/// Returns error if the address cannot be bound or the server fails
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| EcoOptimaError::Config(format!("Failed to bind {}: {}", bind, e)))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(sessions = state.dispatcher.sessions().len(), "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::config::Config;
    use crate::pipeline::PipelineExecutor;
    use crate::providers::Message;
    use crate::session::SessionStore;
    use crate::test_utils::{temp_dir, test_config, tool_call_message, verdict, ScriptedProvider};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn app(provider: &ScriptedProvider, config: &Config) -> (Router, Arc<AppState>) {
        let agent = Agent::new(Arc::new(provider.clone()), &config.agent).unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(SessionStore::new()),
            PipelineExecutor::new(agent),
            config,
        );
        let state = Arc::new(AppState {
            dispatcher,
            cookie_name: config.server.cookie_name.clone(),
            pages_dir: config.server.pages_dir.clone(),
        });
        (router(Arc::clone(&state)), state)
    }

    fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_pages_render_builtin_html() {
        let root = temp_dir();
        let (app, _) = app(&ScriptedProvider::default(), &test_config(root.path()));
        for uri in ["/", "/about", "/community", "/academic", "/consumer", "/government"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
            let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
            assert!(content_type.starts_with("text/html"));
        }
    }

    #[tokio::test]
    async fn test_pages_dir_override() {
        let root = temp_dir();
        let pages = temp_dir();
        std::fs::write(pages.path().join("about.html"), "<h1>Custom about</h1>").unwrap();
        let mut config = test_config(root.path());
        config.server.pages_dir = Some(pages.path().to_path_buf());
        let (app, _) = app(&ScriptedProvider::default(), &config);

        let response = app
            .oneshot(Request::builder().uri("/about").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>Custom about</h1>");
    }

    #[tokio::test]
    async fn test_response_sets_cookie_and_serves_chart() {
        let root = temp_dir();
        let provider = ScriptedProvider::new(vec![
            verdict(true, "Trees."),
            Message::assistant(r#"{"project_type":"tiny forest"}"#),
            Message::assistant(r#"{"rankings":[]}"#),
            Message::assistant("Planting Benefits Advisor: redbuds fix nitrogen."),
            tool_call_message(
                "plot_bar_chart",
                serde_json::json!({"series": [{"tree": "Redbud", "value": 3}], "metric_name": "Height"}),
            ),
            Message::assistant("Local ROI Advisor: plant a tiny forest."),
        ]);
        let (app, _) = app(&provider, &test_config(root.path()));

        let response = app
            .clone()
            .oneshot(form_post("/response", "userInput=Tiny+forest+ideas&mode=analyze", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.starts_with("ecooptima_session="));
        assert!(cookie.contains("HttpOnly"));

        let body = json_body(response).await;
        assert_eq!(body["result"], "Local ROI Advisor: plant a tiny forest.");
        let url = body["img_urls"][0].as_str().unwrap().to_string();

        let chart = app
            .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(chart.status(), StatusCode::OK);
        assert_eq!(chart.headers()[header::CONTENT_TYPE], "image/svg+xml");
    }

    #[tokio::test]
    async fn test_followup_reuses_session_cookie() {
        let root = temp_dir();
        let (app, state) = app(&ScriptedProvider::default(), &test_config(root.path()));
        let session = uuid::Uuid::new_v4().to_string();
        let cookie = format!("theme=dark; ecooptima_session={}", session);

        let response = app
            .oneshot(form_post(
                "/response",
                "userInput=And+maples%3F&mode=followup",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = json_body(response).await;
        assert_eq!(body["result"], crate::error::NO_PRIOR_CONTEXT_MESSAGE);
        assert_eq!(body["img_urls"], serde_json::json!([]));
        assert_eq!(state.dispatcher.sessions().snapshot(&session).await.history().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_clears_session() {
        let root = temp_dir();
        let (app, state) = app(&ScriptedProvider::default(), &test_config(root.path()));
        let session = uuid::Uuid::new_v4().to_string();
        state
            .dispatcher
            .sessions()
            .append_turn(&session, "user", "hello")
            .await;

        let response = app
            .oneshot(form_post(
                "/reset",
                "",
                Some(&format!("ecooptima_session={}", session)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body,
            serde_json::json!({"status": "ok", "message": "Conversation context cleared."})
        );
        assert!(state.dispatcher.sessions().snapshot(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_chart_route_rejects_traversal() {
        let root = temp_dir();
        let (app, _) = app(&ScriptedProvider::default(), &test_config(root.path()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/response_log/../Cargo.toml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::OK);
    }
}
