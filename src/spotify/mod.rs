//! # Spotify Integration Module
//!
//! Thin client for the parts of the Spotify Web API that agetracks needs.
//!
//! ## Core Modules
//!
//! - [`auth`] - Authorization URL, code exchange and token refresh against the
//!   accounts service (confidential client: client id + secret)
//! - [`tracks`] - Top tracks, recommendations and audio features
//! - [`playlist`] - Current user, playlist creation, listing and track adds
//!
//! ## Error Handling
//!
//! Every response status is checked. A non-2xx answer becomes
//! [`SpotifyError::Status`] carrying the upstream body, so callers can tell an
//! expired token (`401`) apart from other failures. GET requests answered with
//! `502 Bad Gateway` or `429 Too Many Requests` are retried a few times,
//! honouring `Retry-After`; POST requests are sent exactly once.
//!
//! ## API Coverage
//!
//! - `GET /me/top/tracks`
//! - `GET /recommendations`
//! - `GET /audio-features`
//! - `GET /me`
//! - `POST /users/{user_id}/playlists`
//! - `GET /me/playlists`
//! - `POST /playlists/{playlist_id}/tracks`
//! - `POST /api/token` (accounts service)

pub mod auth;
pub mod playlist;
pub mod tracks;

use std::{fmt, time::Duration};

use reqwest::{Client, Response, StatusCode, header::RETRY_AFTER};
use serde::{Serialize, de::DeserializeOwned};
use tokio::time::sleep;

use crate::warning;

const MAX_RETRIES: u32 = 3;
const BAD_GATEWAY_DELAY: Duration = Duration::from_secs(2);
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum SpotifyError {
    Http(reqwest::Error),
    Status { status: StatusCode, body: String },
}

impl SpotifyError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SpotifyError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

impl fmt::Display for SpotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpotifyError::Http(e) => write!(f, "request to Spotify failed: {}", e),
            SpotifyError::Status { status, body } => {
                write!(f, "Spotify answered {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for SpotifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpotifyError::Http(e) => Some(e),
            SpotifyError::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for SpotifyError {
    fn from(err: reqwest::Error) -> Self {
        SpotifyError::Http(err)
    }
}

/// Turns a non-2xx response into [`SpotifyError::Status`].
pub(crate) async fn check_status(response: Response) -> Result<Response, SpotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SpotifyError::Status { status, body })
}

/// Web API client bound to one user's access token.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    token: String,
}

impl SpotifyClient {
    pub fn new(http: Client, api_url: &str, token: &str) -> Self {
        SpotifyClient {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SpotifyError> {
        let url = self.url(path);
        let mut attempt = 0;

        loop {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .query(query)
                .send()
                .await?;

            let status = response.status();
            if attempt < MAX_RETRIES
                && (status == StatusCode::BAD_GATEWAY || status == StatusCode::TOO_MANY_REQUESTS)
            {
                let delay = retry_delay(&response);
                attempt += 1;
                warning!(
                    "Spotify answered {} for {}, retrying in {}s ({}/{})",
                    status,
                    path,
                    delay.as_secs(),
                    attempt,
                    MAX_RETRIES
                );
                sleep(delay).await;
                continue;
            }

            let response = check_status(response).await?;
            return Ok(response.json::<T>().await?);
        }
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SpotifyError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Wait before retrying: `Retry-After` when given, otherwise 2s after a 502
/// and 1s after a 429. Never more than 10s.
fn retry_delay(response: &Response) -> Duration {
    let fallback = if response.status() == StatusCode::BAD_GATEWAY {
        BAD_GATEWAY_DELAY
    } else {
        Duration::from_secs(1)
    };

    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(fallback)
        .min(MAX_RETRY_AFTER)
}
