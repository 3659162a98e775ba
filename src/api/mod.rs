//! # API Module
//!
//! HTTP endpoints of the agetracks web service.
//!
//! ## Endpoints
//!
//! - [`index`] - `GET /`, redirects to Spotify's authorization page
//! - [`callback`] - `GET /callback`, completes the authorization-code flow and
//!   shows the age form
//! - [`recommendations`] - `GET /recommendations?age=<int>`, builds the
//!   playlist and redirects to it
//! - [`refresh_token`] - `GET /refresh-token`, renews the access token
//! - [`health`] - `GET /health`, status and version for monitoring
//!
//! ## Sessions
//!
//! Handlers receive the caller's session as an explicit [`SessionContext`]
//! extracted from the signed `agetracks_session` cookie, and write changes
//! back through [`SessionContext::save`].

mod auth;
mod health;
mod recommendations;
mod session;

pub use auth::callback;
pub use auth::index;
pub use auth::recommendations_path;
pub use auth::refresh_token;
pub use health::health;
pub use recommendations::recommendations;
pub use session::SessionContext;
