use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::session::SessionContext;
use crate::{
    info,
    openai::OpenAiClient,
    pipeline::{PipelineError, RecommendationPipeline},
    server::AppState,
    spotify::SpotifyClient,
    utils, warning,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    pub age: Option<String>,
}

/// `GET /recommendations?age=<int>` - runs the pipeline for the caller.
///
/// Without a session the browser is sent to `/` to log in; with an expired
/// one to `/refresh-token`. A valid requested age is remembered so the
/// refresh can come back to it once; an invalid one clears it.
pub async fn recommendations(
    Extension(state): Extension<Arc<AppState>>,
    mut ctx: SessionContext,
    Query(params): Query<RecommendationParams>,
) -> Response {
    let Some(access_token) = ctx.session.access_token.clone() else {
        return Redirect::to("/").into_response();
    };

    let age = params
        .age
        .as_deref()
        .and_then(|a| a.trim().parse::<u32>().ok());

    // only an expired session remembers the age, and only the one asked for now
    let mut session = ctx.session.clone();
    let expired = session.is_expired(utils::now_timestamp());
    let pending_age = if expired { age } else { None };
    if session.pending_age != pending_age {
        session.pending_age = pending_age;
        ctx.save(&state, session).await;
    }

    if expired {
        info!("Access token expired, refreshing");
        return Redirect::to("/refresh-token").into_response();
    }

    let Some(age) = age else {
        return (
            StatusCode::BAD_REQUEST,
            Html("<h4>Please provide an age, e.g. <code>/recommendations?age=25</code>.</h4>"),
        )
            .into_response();
    };

    info!("Building recommendations for age {}", age);

    let spotify = SpotifyClient::new(state.http.clone(), &state.config.spotify_api_url, &access_token);
    let model = OpenAiClient::new(state.http.clone(), &state.config);
    let pipeline = RecommendationPipeline::new(&spotify, &model, &state.config.spotify_playlist_url);

    match pipeline.run(age).await {
        Ok(report) => Redirect::to(&report.playlist.url).into_response(),
        Err(e) if e.is_unauthorized() && e.partial_playlist().is_none() => {
            warning!("Spotify rejected the access token: {}", e);
            Redirect::to("/refresh-token").into_response()
        }
        Err(e) => {
            warning!("Recommendation pipeline failed: {}", e);
            e.into_response()
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.to_string(),
            "step": self.step().as_str(),
        });
        if let Some(playlist) = self.partial_playlist() {
            body["playlist"] = json!(playlist);
        }

        (StatusCode::BAD_GATEWAY, Json(body)).into_response()
    }
}
