#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

use agetracks::config::{Config, DEFAULT_SCOPE};

pub const GOOD_CODE: &str = "good-code";
pub const USER_ID: &str = "user-1";
pub const CREATED_PLAYLIST_ID: &str = "pl-new";

/// Stand-in for the Spotify accounts service, the Web API and the model API.
pub struct MockUpstream {
    pub model_reply: String,
    /// Statuses answered, in order, before `me/top/tracks` succeeds.
    pub top_tracks_failures: Mutex<VecDeque<StatusCode>>,
    pub top_tracks_calls: AtomicUsize,
    pub create_playlist_failures: Mutex<VecDeque<StatusCode>>,
    pub create_playlist_calls: AtomicUsize,
    pub add_tracks_failure: Option<StatusCode>,
    pub recommendation_queries: Mutex<Vec<HashMap<String, String>>>,
    pub created_playlists: Mutex<Vec<String>>,
    pub added_uris: Mutex<Vec<String>>,
    pub token_forms: Mutex<Vec<HashMap<String, String>>>,
}

impl MockUpstream {
    pub fn new(model_reply: &str) -> Self {
        MockUpstream {
            model_reply: model_reply.to_string(),
            top_tracks_failures: Mutex::new(VecDeque::new()),
            top_tracks_calls: AtomicUsize::new(0),
            create_playlist_failures: Mutex::new(VecDeque::new()),
            create_playlist_calls: AtomicUsize::new(0),
            add_tracks_failure: None,
            recommendation_queries: Mutex::new(Vec::new()),
            created_playlists: Mutex::new(Vec::new()),
            added_uris: Mutex::new(Vec::new()),
            token_forms: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_add_tracks(self) -> Self {
        self.failing_add_tracks_with(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn failing_add_tracks_with(mut self, status: StatusCode) -> Self {
        self.add_tracks_failure = Some(status);
        self
    }

    pub fn with_top_tracks_failures(self, statuses: &[StatusCode]) -> Self {
        self.top_tracks_failures.lock().unwrap().extend(statuses);
        self
    }

    pub fn with_create_playlist_failures(self, statuses: &[StatusCode]) -> Self {
        self.create_playlist_failures.lock().unwrap().extend(statuses);
        self
    }

    pub fn top_tracks_calls(&self) -> usize {
        self.top_tracks_calls.load(Ordering::SeqCst)
    }

    pub fn create_playlist_calls(&self) -> usize {
        self.create_playlist_calls.load(Ordering::SeqCst)
    }
}

/// Spotify-style error body; `Retry-After: 0` keeps retries instant.
fn upstream_failure(status: StatusCode) -> Response {
    (
        status,
        [(RETRY_AFTER, "0")],
        Json(json!({ "error": { "status": status.as_u16(), "message": "Upstream failure" } })),
    )
        .into_response()
}

pub const GOOD_REPLY: &str =
    r#"{"audio_features": {"danceability": 0.7, "energy": 0.8, "valence": 0.6}}"#;

pub fn top_track_ids() -> Vec<String> {
    (0..5).map(|i| format!("top{}", i)).collect()
}

pub fn recommended_ids() -> Vec<String> {
    (0..25).map(|i| format!("rec{}", i)).collect()
}

fn track_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Song {}", id),
        "uri": format!("spotify:track:{}", id),
    })
}

async fn token(
    State(mock): State<Arc<MockUpstream>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    mock.token_forms.lock().unwrap().push(form.clone());

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some(GOOD_CODE) => {
            Json(json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "scope": DEFAULT_SCOPE,
                "expires_in": 3600,
                "refresh_token": "refresh-1"
            }))
            .into_response()
        }
        Some("refresh_token") if form.get("refresh_token").map(String::as_str) == Some("refresh-1") => {
            Json(json!({
                "access_token": "access-2",
                "token_type": "Bearer",
                "scope": DEFAULT_SCOPE,
                "expires_in": 3600
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" })),
        )
            .into_response(),
    }
}

async fn top_tracks(State(mock): State<Arc<MockUpstream>>) -> Response {
    mock.top_tracks_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = mock.top_tracks_failures.lock().unwrap().pop_front() {
        return upstream_failure(status);
    }
    let items: Vec<Value> = top_track_ids().iter().map(|id| track_json(id)).collect();
    Json(json!({ "items": items })).into_response()
}

async fn recommendations(
    State(mock): State<Arc<MockUpstream>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    mock.recommendation_queries.lock().unwrap().push(query);
    let tracks: Vec<Value> = recommended_ids().iter().map(|id| track_json(id)).collect();
    Json(json!({ "tracks": tracks }))
}

async fn audio_features(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let ids = query.get("ids").cloned().unwrap_or_default();
    let features: Vec<Value> = ids
        .split(',')
        .enumerate()
        .map(|(i, id)| {
            // one unknown track comes back as null
            if i == 3 {
                Value::Null
            } else {
                json!({ "id": id, "danceability": 0.5, "energy": 0.6, "valence": 0.4 })
            }
        })
        .collect();
    Json(json!({ "audio_features": features }))
}

async fn me() -> Json<Value> {
    Json(json!({ "id": USER_ID, "display_name": "Test User" }))
}

async fn create_playlist(
    State(mock): State<Arc<MockUpstream>>,
    Path(user_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    mock.create_playlist_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = mock.create_playlist_failures.lock().unwrap().pop_front() {
        return upstream_failure(status);
    }
    if user_id != USER_ID {
        return StatusCode::FORBIDDEN.into_response();
    }
    let name = body["name"].as_str().unwrap_or_default().to_string();
    mock.created_playlists.lock().unwrap().push(name.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "id": CREATED_PLAYLIST_ID, "name": name, "public": true })),
    )
        .into_response()
}

async fn user_playlists(State(mock): State<Arc<MockUpstream>>) -> Json<Value> {
    let mut items = vec![json!({ "id": "pl-other", "name": "Road trip" })];
    for name in mock.created_playlists.lock().unwrap().iter() {
        // an older playlist with the same name is listed first
        items.push(json!({ "id": "pl-old", "name": name }));
        items.push(json!({ "id": CREATED_PLAYLIST_ID, "name": name }));
    }
    Json(json!({ "items": items }))
}

async fn add_tracks(
    State(mock): State<Arc<MockUpstream>>,
    Path(playlist_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(status) = mock.add_tracks_failure {
        return upstream_failure(status);
    }
    if playlist_id != CREATED_PLAYLIST_ID {
        return StatusCode::NOT_FOUND.into_response();
    }
    let uris = body["uris"]
        .as_array()
        .map(|a| a.iter().filter_map(|u| u.as_str().map(String::from)).collect::<Vec<_>>())
        .unwrap_or_default();
    mock.added_uris.lock().unwrap().extend(uris);
    (StatusCode::CREATED, Json(json!({ "snapshot_id": "snap-1" }))).into_response()
}

async fn chat_completion(State(mock): State<Arc<MockUpstream>>) -> Json<Value> {
    Json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": mock.model_reply },
            "finish_reason": "stop"
        }]
    }))
}

/// Binds the mock on an ephemeral port and returns its base URL.
pub async fn spawn_mock(mock: Arc<MockUpstream>) -> String {
    let app = Router::new()
        .route("/api/token", post(token))
        .route("/v1/me/top/tracks", get(top_tracks))
        .route("/v1/recommendations", get(recommendations))
        .route("/v1/audio-features", get(audio_features))
        .route("/v1/me", get(me))
        .route("/v1/users/{user_id}/playlists", post(create_playlist))
        .route("/v1/me/playlists", get(user_playlists))
        .route("/v1/playlists/{playlist_id}/tracks", post(add_tracks))
        .route("/openai/chat/completions", post(chat_completion))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

pub fn test_config(base_url: &str) -> Config {
    Config {
        spotify_client_id: "client-id".to_string(),
        spotify_client_secret: "client-secret".to_string(),
        spotify_redirect_uri: "http://localhost:5001/callback".to_string(),
        spotify_scope: DEFAULT_SCOPE.to_string(),
        spotify_auth_url: "https://accounts.spotify.com/authorize".to_string(),
        spotify_token_url: format!("{}/api/token", base_url),
        spotify_api_url: format!("{}/v1", base_url),
        spotify_playlist_url: "https://open.spotify.com/playlist".to_string(),
        session_secret: "test-session-secret".to_string(),
        openai_api_key: "sk-test".to_string(),
        openai_api_url: format!("{}/openai", base_url),
        openai_model: "gpt-4o-mini".to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        request_timeout: Duration::from_secs(5),
    }
}
