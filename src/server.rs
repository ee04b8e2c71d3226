use crate::error::ApiError;
use crate::store::{NewSession, Session, Sessions, Status, StoreError};
use crate::suggest::service::SuggestionService;
use crate::suggest::{SuggestionRequest, SuggestionResult};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::signal;

const POPULAR_LIMIT: usize = 6;

pub struct AppState {
    sessions: Mutex<Sessions>,
    suggester: SuggestionService,
}

impl AppState {
    pub fn new(sessions: Sessions, suggester: SuggestionService) -> Self {
        Self {
            sessions: Mutex::new(sessions),
            suggester,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        // transitions build a new snapshot before swapping it in, so a
        // poisoned lock still guards a consistent value
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/agenda", get(agenda_page))
        .route("/health", get(health))
        .route("/api/sessions", get(list_sessions).post(submit_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/upvote", post(upvote_session))
        .route("/api/sessions/:id/schedule", post(schedule_session))
        .route("/api/ai-suggest", post(ai_suggest))
        .with_state(state)
}

pub async fn run_server(bind_addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Unconf server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> &'static str {
    "unconf OK"
}

#[derive(Deserialize)]
struct ListQuery {
    sort: Option<String>,
    status: Option<String>,
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some("proposed") => Some(Status::Proposed),
        Some("scheduled") => Some(Status::Scheduled),
        Some(other) => {
            return Err(ApiError::MalformedPayload(format!("unknown status {}", other)));
        }
    };

    let sessions = state.sessions();
    let mut listed: Vec<&Session> = match query.sort.as_deref() {
        Some("votes") => sessions.popular(usize::MAX),
        _ => sessions.all().iter().collect(),
    };
    if let Some(status) = status {
        listed.retain(|s| s.status() == status);
    }

    Ok(Json(listed.into_iter().cloned().collect()))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state.sessions().get(&id).cloned();
    session
        .map(Json)
        .ok_or(ApiError::Store(StoreError::NotFound(id)))
}

async fn submit_session(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewSession>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = payload.map_err(|e| ApiError::MalformedPayload(e.body_text()))?;

    let mut sessions = state.sessions();
    let (next, session) = sessions.add(new, chrono::Utc::now().timestamp_millis())?;
    *sessions = next;

    info!("Stored session {}: {}", session.id, session.title);
    Ok((StatusCode::CREATED, Json(session)))
}

async fn upvote_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let mut sessions = state.sessions();
    let next = sessions.upvote(&id)?;
    *sessions = next;

    let session = sessions
        .get(&id)
        .cloned()
        .ok_or(ApiError::Store(StoreError::NotFound(id)))?;
    info!("Upvoted session {} ({} votes)", session.id, session.votes);
    Ok(Json(session))
}

#[derive(Deserialize)]
struct ScheduleRequest {
    #[serde(default)]
    time: String,
    #[serde(default)]
    location: String,
}

async fn schedule_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::MalformedPayload(e.body_text()))?;

    let mut sessions = state.sessions();
    let next = sessions.schedule(&id, &request.time, &request.location)?;
    *sessions = next;

    let session = sessions
        .get(&id)
        .cloned()
        .ok_or(ApiError::Store(StoreError::NotFound(id)))?;
    info!("Scheduled session {} at {:?}", session.id, session.slot());
    Ok(Json(session))
}

// The body is decoded regardless of Content-Type; only undecodable JSON is an error.
async fn ai_suggest(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SuggestionResult>, ApiError> {
    let request: SuggestionRequest = serde_json::from_slice(&body).map_err(|e| {
        error!("Error generating AI suggestion: {}", e);
        ApiError::Suggestion {
            details: e.to_string(),
        }
    })?;

    Ok(Json(state.suggester.suggest(&request).await))
}

const STYLE: &str = r#"<style>
body { font-family: system-ui, sans-serif; margin: 2rem; background: #1a1a2e; color: #eee; }
h1, h2 { color: #00d9ff; }
table { border-collapse: collapse; width: 100%; max-width: 1000px; margin-bottom: 2rem; }
th, td { padding: 0.5rem 1rem; text-align: left; border-bottom: 1px solid #333; }
th { background: #16213e; color: #00d9ff; }
tr:hover { background: #16213e; }
.number { text-align: right; font-variant-numeric: tabular-nums; }
.status { color: #888; }
a { color: #00d9ff; }
</style>"#;

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let sessions = state.sessions();
    Html(render_index_html(&sessions))
}

async fn agenda_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let sessions = state.sessions();
    Html(render_agenda_html(&sessions))
}

fn render_index_html(sessions: &Sessions) -> String {
    let mut html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>Unconference Sessions</title>
{}
</head>
<body>
<h1>Unconference Sessions</h1>
<p><a href="agenda">Agenda</a> | <a href="health">Health Check</a></p>
"#,
        STYLE
    );

    html.push_str("<h2>Popular</h2>\n");
    html.push_str(&render_session_table(&sessions.popular(POPULAR_LIMIT)));

    html.push_str("<h2>All Sessions</h2>\n");
    let all: Vec<&Session> = sessions.all().iter().collect();
    html.push_str(&render_session_table(&all));

    html.push_str("</body></html>");
    html
}

fn render_session_table(sessions: &[&Session]) -> String {
    if sessions.is_empty() {
        return "<p>No sessions yet. Proposals sent to <code>POST /api/sessions</code> show up here.</p>\n".to_string();
    }

    let mut html = String::from(
        "<table>\n<tr><th>Title</th><th>Presenter</th><th>Track</th><th class=\"number\">Votes</th><th>Status</th></tr>\n",
    );

    for session in sessions {
        let status = match session.slot() {
            Some(slot) => format!("{} in {}", html_escape(&slot.time), html_escape(&slot.location)),
            None => "proposed".to_string(),
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"number\">{}</td><td class=\"status\">{}</td></tr>\n",
            html_escape(&session.title),
            html_escape(&session.presenter),
            session.track,
            session.votes,
            status
        ));
    }

    html.push_str("</table>\n");
    html
}

fn render_agenda_html(sessions: &Sessions) -> String {
    let agenda = sessions.agenda();

    let mut html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>Unconference Agenda</title>
{}
</head>
<body>
<h1>Agenda</h1>
<p><a href="./">Sessions</a></p>
"#,
        STYLE
    );

    if agenda.is_empty() {
        html.push_str("<p>No sessions have been scheduled yet.</p>");
        html.push_str("</body></html>");
        return html;
    }

    html.push_str("<h2>By Time</h2>\n<table>\n<tr><th>Time</th><th>Title</th><th>Presenter</th><th>Track</th><th>Location</th></tr>\n");
    for (time, slot_sessions) in &agenda.by_time {
        for session in slot_sessions {
            let location = session.slot().map(|s| s.location.as_str()).unwrap_or_default();
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(time),
                html_escape(&session.title),
                html_escape(&session.presenter),
                session.track,
                html_escape(location)
            ));
        }
    }
    html.push_str("</table>\n");

    html.push_str("<h2>By Track</h2>\n");
    for (track, track_sessions) in &agenda.by_track {
        html.push_str(&format!("<h3>{}</h3>\n<ul>\n", track));
        for session in track_sessions {
            let when = session
                .slot()
                .map(|s| format!("{}, {}", s.time, s.location))
                .unwrap_or_default();
            html.push_str(&format!(
                "<li>{} ({}) - {}</li>\n",
                html_escape(&session.title),
                html_escape(&session.presenter),
                html_escape(&when)
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</body></html>");
    html
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;
    use crate::suggest::upstream::tests::{config_for, mock_deployment, spawn};
    use crate::suggest::upstream::AzureConfig;
    use chrono::Datelike;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn offline_config() -> AzureConfig {
        let mut config = config_for("127.0.0.1:1".parse().unwrap());
        config.api_key.clear();
        config
    }

    async fn start(sessions: Sessions, azure: AzureConfig) -> (SocketAddr, reqwest::Client) {
        let suggester = SuggestionService::new(azure, Duration::from_secs(5)).unwrap();
        let state = Arc::new(AppState::new(sessions, suggester));
        (spawn(app(state)).await, reqwest::Client::new())
    }

    async fn start_seeded() -> (SocketAddr, reqwest::Client) {
        start(store::seed_sessions(), offline_config()).await
    }

    #[tokio::test]
    async fn test_health() {
        let (addr, client) = start_seeded().await;
        let body = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "unconf OK");
    }

    #[tokio::test]
    async fn test_list_sorted_and_filtered() {
        let (addr, client) = start_seeded().await;

        let all: Vec<serde_json::Value> = client
            .get(format!("http://{}/api/sessions", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all.len(), 10);

        let proposed: Vec<serde_json::Value> = client
            .get(format!("http://{}/api/sessions?status=proposed&sort=votes", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let ids: Vec<&str> = proposed.iter().map(|s| s["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["4", "5", "6", "7"]);

        let bad = client
            .get(format!("http://{}/api/sessions?status=cancelled", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_then_fetch() {
        let (addr, client) = start_seeded().await;

        let created = client
            .post(format!("http://{}/api/sessions", addr))
            .json(&serde_json::json!({
                "title": "Async Rust in Production",
                "presenter": "Ferris",
                "track": "Development",
                "description": "Lessons from running tokio services at scale."
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let session: serde_json::Value = created.json().await.unwrap();
        assert_eq!(session["votes"], 1);
        assert_eq!(session["status"], "proposed");
        assert!(session["time"].is_null());

        let id = session["id"].as_str().unwrap();
        let fetched: serde_json::Value = client
            .get(format!("http://{}/api/sessions/{}", addr, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched["title"], "Async Rust in Production");
    }

    #[tokio::test]
    async fn test_submit_validation_errors() {
        let (addr, client) = start_seeded().await;

        let response = client
            .post(format!("http://{}/api/sessions", addr))
            .json(&serde_json::json!({ "title": "Hi", "description": "short" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["fields"]["presenter"], "Presenter name is required");
        assert_eq!(body["fields"]["track"], "Track is required");
        assert_eq!(
            body["fields"]["description"],
            "Description must be at least 20 characters"
        );
        assert!(body["fields"].get("title").is_none());

        let garbage = client
            .post(format!("http://{}/api/sessions", addr))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upvote_and_missing_session() {
        let (addr, client) = start_seeded().await;

        for expected in [13, 14] {
            let session: serde_json::Value = client
                .post(format!("http://{}/api/sessions/4/upvote", addr))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            assert_eq!(session["votes"], expected);
        }

        let other: serde_json::Value = client
            .get(format!("http://{}/api/sessions/5", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(other["votes"], 10);

        let missing = client
            .post(format!("http://{}/api/sessions/404/upvote", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_schedule_session() {
        let (addr, client) = start_seeded().await;

        let rejected = client
            .post(format!("http://{}/api/sessions/5/schedule", addr))
            .json(&serde_json::json!({ "time": "9:00 AM - 10:00 AM" }))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let session: serde_json::Value = client
            .post(format!("http://{}/api/sessions/5/schedule", addr))
            .json(&serde_json::json!({ "time": "9:00 AM - 10:00 AM", "location": "Room D" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session["status"], "scheduled");
        assert_eq!(session["time"], "9:00 AM - 10:00 AM");
        assert_eq!(session["location"], "Room D");

        let agenda = client
            .get(format!("http://{}/agenda", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(agenda.contains("Leading Engineering Teams"));
        assert!(agenda.contains("<h3>Leadership</h3>"));
    }

    #[tokio::test]
    async fn test_ai_suggest_without_key_returns_design_template() {
        let (addr, client) = start_seeded().await;

        let response = client
            .post(format!("http://{}/api/ai-suggest", addr))
            .json(&serde_json::json!({ "track": "Design" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let result: SuggestionResult = response.json().await.unwrap();
        assert_eq!(
            result.title,
            format!("UX Design Patterns for {}", chrono::Local::now().year())
        );
        assert!(result.description.starts_with("Join you for an interactive session"));
    }

    #[tokio::test]
    async fn test_ai_suggest_uses_upstream_completion() {
        let upstream = spawn(mock_deployment(serde_json::json!({
            "choices": [{"message": {"content": "Title: Leading Without Authority\nDescription: Influence for ICs."}}]
        })))
        .await;
        let (addr, client) = start(store::seed_sessions(), config_for(upstream)).await;

        let result: SuggestionResult = client
            .post(format!("http://{}/api/ai-suggest", addr))
            .json(&serde_json::json!({ "track": "Leadership", "presenter": "Kai" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(result.title, "Leading Without Authority");
        assert_eq!(result.description, "Influence for ICs.");
    }

    #[tokio::test]
    async fn test_ai_suggest_malformed_body_is_server_error() {
        let (addr, client) = start_seeded().await;

        let response = client
            .post(format!("http://{}/api/ai-suggest", addr))
            .header("content-type", "application/json")
            .body("{\"track\": 42")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Failed to generate suggestion");
        assert!(!body["details"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_lists_sessions_escaped() {
        let sessions = store::seed_sessions()
            .add(
                NewSession {
                    title: Some("<script>alert(1)</script>".to_string()),
                    presenter: Some("Mallory".to_string()),
                    track: Some("Product".to_string()),
                    description: Some("A description that is long enough.".to_string()),
                },
                100,
            )
            .unwrap()
            .0;
        let (addr, client) = start(sessions, offline_config()).await;

        let html = client
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(html.contains("Building Accessible Web Applications"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert"));
    }

    #[tokio::test]
    async fn test_ai_suggest_ignores_content_type() {
        let (addr, client) = start_seeded().await;

        let response = client
            .post(format!("http://{}/api/ai-suggest", addr))
            .header("content-type", "text/plain;charset=UTF-8")
            .body(r#"{"track":"Design"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let result: SuggestionResult = response.json().await.unwrap();
        assert_eq!(
            result.title,
            format!("UX Design Patterns for {}", chrono::Local::now().year())
        );
        assert!(result.description.starts_with("Join you for an interactive session"));
    }

    #[test]
    fn test_empty_index_page() {
        let html = render_index_html(&Sessions::default());
        assert!(html.contains("No sessions yet."));
        assert!(html.contains("POST /api/sessions"));
    }

    #[test]
    fn test_empty_agenda_page() {
        let html = render_agenda_html(&Sessions::default());
        assert!(html.contains("No sessions have been scheduled yet."));
    }
}
