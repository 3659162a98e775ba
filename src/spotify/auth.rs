use reqwest::{Client, Url};

use super::{SpotifyError, check_status};
use crate::{config::Config, types::Token};

/// Builds the Spotify authorization URL the browser is redirected to.
///
/// `show_dialog=true` forces the consent screen even for returning users so
/// that switching accounts is possible. `state` is echoed back on the
/// callback and must match the value stored in the session.
///
/// # Example
///
/// ```ignore
/// let url = authorize_url(&config, "h3Yx...")?;
/// // https://accounts.spotify.com/authorize?client_id=...&response_type=code&...
/// ```
pub fn authorize_url(config: &Config, state: &str) -> Result<String, String> {
    Url::parse_with_params(
        &config.spotify_auth_url,
        &[
            ("client_id", config.spotify_client_id.as_str()),
            ("response_type", "code"),
            ("scope", config.spotify_scope.as_str()),
            ("redirect_uri", config.spotify_redirect_uri.as_str()),
            ("show_dialog", "true"),
            ("state", state),
        ],
    )
    .map(String::from)
    .map_err(|e| format!("invalid SPOTIFY_API_AUTH_URL: {}", e))
}

/// Exchanges an authorization code for an access and refresh token.
///
/// Uses the confidential-client variant of the authorization-code grant: the
/// client secret is sent in the form body alongside the client id.
///
/// # Errors
///
/// - [`SpotifyError::Http`] on network failure or an undecodable body
/// - [`SpotifyError::Status`] when the accounts service rejects the code; the
///   body holds Spotify's JSON error payload
pub async fn exchange_code(http: &Client, config: &Config, code: &str) -> Result<Token, SpotifyError> {
    let res = http
        .post(&config.spotify_token_url)
        .form(&[
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", config.spotify_redirect_uri.as_str()),
            ("client_id", config.spotify_client_id.as_str()),
            ("client_secret", config.spotify_client_secret.as_str()),
        ])
        .send()
        .await?;

    let res = check_status(res).await?;
    Ok(res.json::<Token>().await?)
}

/// Refreshes an expired access token using a refresh token.
///
/// Spotify may or may not return a new refresh token; callers keep the one
/// they already hold.
pub async fn refresh_token(
    http: &Client,
    config: &Config,
    refresh_token: &str,
) -> Result<Token, SpotifyError> {
    let res = http
        .post(&config.spotify_token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.spotify_client_id.as_str()),
            ("client_secret", config.spotify_client_secret.as_str()),
        ])
        .send()
        .await?;

    let res = check_status(res).await?;
    Ok(res.json::<Token>().await?)
}
