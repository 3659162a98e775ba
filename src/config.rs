//! Configuration management for agetracks.
//!
//! Values come from environment variables, optionally seeded from `.env`
//! files. The hierarchy is:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory (`agetracks/.env`)
//! 3. `.env` file in the current working directory
//! 4. Application defaults (where applicable)

use std::{env, fmt, path::PathBuf, time::Duration};

pub const DEFAULT_SCOPE: &str =
    "user-read-private user-read-email user-top-read playlist-modify-public playlist-read-private";

/// Loads environment variables from `.env` files.
///
/// Creates the `agetracks` directory under the platform-specific local data
/// directory if it doesn't exist, then loads `agetracks/.env` from there and
/// a `.env` from the working directory. Both files are optional; variables
/// already present in the environment are never overwritten.
///
/// # Errors
///
/// Returns an error string if the data directory cannot be created.
pub async fn load_env() -> Result<(), String> {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("agetracks/.env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    dotenv::from_path(&path).ok();
    dotenv::dotenv().ok();
    Ok(())
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "{} must be set", name),
            ConfigError::Invalid { name, value } => {
                write!(f, "{} has an invalid value: {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings shared by every request handler.
#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub spotify_scope: String,
    pub spotify_auth_url: String,
    pub spotify_token_url: String,
    pub spotify_api_url: String,
    pub spotify_playlist_url: String,
    pub session_secret: String,
    pub openai_api_key: String,
    pub openai_api_url: String,
    pub openai_model: String,
    pub server_host: String,
    pub server_port: u16,
    pub request_timeout: Duration,
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// Call [`load_env`] first if `.env` files should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_port = optional("PORT", "5000");
        let server_port = server_port
            .parse::<u16>()
            .map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: server_port.clone(),
            })?;

        let timeout = optional("REQUEST_TIMEOUT_SECS", "30");
        let timeout = timeout.parse::<u64>().map_err(|_| ConfigError::Invalid {
            name: "REQUEST_TIMEOUT_SECS",
            value: timeout.clone(),
        })?;

        Ok(Config {
            spotify_client_id: required("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            spotify_redirect_uri: optional(
                "SPOTIFY_API_REDIRECT_URI",
                "http://localhost:5001/callback",
            ),
            spotify_scope: optional("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE),
            spotify_auth_url: optional(
                "SPOTIFY_API_AUTH_URL",
                "https://accounts.spotify.com/authorize",
            ),
            spotify_token_url: optional(
                "SPOTIFY_API_TOKEN_URL",
                "https://accounts.spotify.com/api/token",
            ),
            spotify_api_url: trim_url(optional("SPOTIFY_API_URL", "https://api.spotify.com/v1")),
            spotify_playlist_url: trim_url(optional(
                "SPOTIFY_PLAYLIST_URL",
                "https://open.spotify.com/playlist",
            )),
            session_secret: required("SESSION_SECRET")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_api_url: trim_url(optional("OPENAI_API_URL", "https://api.openai.com/v1")),
            openai_model: optional("OPENAI_MODEL", "gpt-4o-mini"),
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port,
            request_timeout: Duration::from_secs(timeout),
        })
    }

    /// Address the HTTP server binds to, e.g. `0.0.0.0:5000`.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
