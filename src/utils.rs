use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::{Rng, distr::Alphanumeric};
use sha2::Sha256;

use crate::types::{Track, TrackRef};

type HmacSha256 = Hmac<Sha256>;

pub const TRACK_URI_PREFIX: &str = "spotify:track:";

/// Random alphanumeric string, used for session ids and OAuth `state`.
pub fn generate_random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn mac(secret: &str, value: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(value.as_bytes());
    Some(mac)
}

/// HMAC-SHA256 of `value` keyed with `secret`, URL-safe base64 without
/// padding.
pub fn sign(secret: &str, value: &str) -> String {
    mac(secret, value)
        .map(|mac| URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Checks `signature` against `sign(secret, value)` in constant time.
pub fn verify_signature(secret: &str, value: &str, signature: &str) -> bool {
    let Ok(tag) = URL_SAFE_NO_PAD.decode(signature) else {
        return false;
    };
    mac(secret, value).is_some_and(|mac| mac.verify_slice(&tag).is_ok())
}

/// Bare id of a `spotify:track:<id>` URI. Other URI kinds give `None`.
pub fn track_id_from_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix(TRACK_URI_PREFIX).filter(|id| !id.is_empty())
}

/// Converts a Web API track, preferring the id encoded in its URI and
/// falling back to `track.id`.
pub fn to_track_ref(track: &Track) -> TrackRef {
    let id = track_id_from_uri(&track.uri).unwrap_or(&track.id).to_string();
    TrackRef {
        name: track.name.clone(),
        uri: track.uri.clone(),
        id,
    }
}

/// Name of the playlist created for `age`, e.g. "Age 30 recommendations".
pub fn playlist_name(age: u32) -> String {
    format!("Age {} recommendations", age)
}

/// Public link for a playlist: `base` joined with the id by a single `/`.
pub fn playlist_url(base: &str, playlist_id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), playlist_id)
}

pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````).
///
/// The language tag is dropped both when it sits on its own line and when
/// the whole fence is on one line.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().trim_end_matches("```").trim()
}
