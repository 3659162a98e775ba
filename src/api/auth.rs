use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::session::{SessionContext, with_cookie};
use crate::{
    info,
    server::AppState,
    spotify::{self, SpotifyError},
    success, utils, warning,
};

const INDEX_PAGE: &str = include_str!("../../templates/index.html");
const OAUTH_STATE_LEN: usize = 32;

/// `GET /` - sends the browser to Spotify's consent screen.
pub async fn index(Extension(state): Extension<Arc<AppState>>, mut ctx: SessionContext) -> Response {
    let oauth_state = utils::generate_random_string(OAUTH_STATE_LEN);

    let url = match spotify::auth::authorize_url(&state.config, &oauth_state) {
        Ok(url) => url,
        Err(e) => {
            warning!("{}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h4>Authorization is misconfigured.</h4>"),
            )
                .into_response();
        }
    };

    let mut session = ctx.session.clone();
    session.oauth_state = Some(oauth_state);
    session.created_at = utils::now_timestamp();
    let cookie = ctx.save(&state, session).await;

    info!("Redirecting to Spotify authorization");
    with_cookie(Redirect::to(&url).into_response(), cookie)
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub state: Option<String>,
}

/// `GET /callback` - exchanges the authorization code for tokens.
pub async fn callback(
    Extension(state): Extension<Arc<AppState>>,
    mut ctx: SessionContext,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error {
        warning!("Authorization denied: {}", error);
        if let Some(id) = ctx.id.as_deref().filter(|_| !ctx.session.is_authenticated()) {
            state.sessions.remove(id).await;
        }
        return Json(json!({ "error": error })).into_response();
    }

    let Some(code) = params.code else {
        return (
            StatusCode::BAD_REQUEST,
            Html("<h4>Missing authorization code.</h4>"),
        )
            .into_response();
    };

    let mut session = ctx.session.clone();
    let state_matches = matches!(
        (&session.oauth_state, &params.state),
        (Some(expected), Some(received)) if expected == received
    );
    if !state_matches {
        warning!("OAuth state mismatch on callback");
        return (
            StatusCode::BAD_REQUEST,
            Html("<h4>Login expired or was tampered with. <a href=\"/\">Try again</a>.</h4>"),
        )
            .into_response();
    }

    let token = match spotify::auth::exchange_code(&state.http, &state.config, &code).await {
        Ok(token) => token,
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            return upstream_error(e);
        }
    };

    session.oauth_state = None;
    session.access_token = Some(token.access_token);
    if token.refresh_token.is_some() {
        session.refresh_token = token.refresh_token;
    }
    session.expires_at = utils::now_timestamp() + token.expires_in;
    let cookie = ctx.save(&state, session).await;

    success!("Authentication successful");
    with_cookie(Html(INDEX_PAGE).into_response(), cookie)
}

/// `GET /refresh-token` - swaps the refresh token for a new access token.
///
/// The stored refresh token is kept as is. Afterwards the browser goes back
/// to `/recommendations`, with the age it asked for if one is remembered.
pub async fn refresh_token(
    Extension(state): Extension<Arc<AppState>>,
    mut ctx: SessionContext,
) -> Response {
    let Some(refresh) = ctx.session.refresh_token.clone() else {
        return Redirect::to("/").into_response();
    };

    let token = match spotify::auth::refresh_token(&state.http, &state.config, &refresh).await {
        Ok(token) => token,
        Err(e) => {
            warning!("Token refresh failed: {}", e);
            if let SpotifyError::Status { status, .. } = &e {
                if *status == StatusCode::BAD_REQUEST || *status == StatusCode::UNAUTHORIZED {
                    return Redirect::to("/").into_response();
                }
            }
            return upstream_error(e);
        }
    };

    let mut session = ctx.session.clone();
    session.access_token = Some(token.access_token);
    session.expires_at = utils::now_timestamp() + token.expires_in;
    let target = recommendations_path(session.pending_age.take());
    ctx.save(&state, session).await;

    info!("Access token refreshed");
    Redirect::to(&target).into_response()
}

pub fn recommendations_path(age: Option<u32>) -> String {
    match age {
        Some(age) => format!("/recommendations?age={}", age),
        None => "/recommendations".to_string(),
    }
}

/// Passes Spotify's JSON error payload through with `502 Bad Gateway`.
fn upstream_error(err: SpotifyError) -> Response {
    let body = match &err {
        SpotifyError::Status { body, .. } => serde_json::from_str::<Value>(body)
            .unwrap_or_else(|_| json!({ "error": body })),
        SpotifyError::Http(e) => json!({ "error": e.to_string() }),
    };

    (StatusCode::BAD_GATEWAY, Json(body)).into_response()
}
