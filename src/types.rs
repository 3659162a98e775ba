use serde::{Deserialize, Serialize};

/// Token payload returned by the Spotify accounts service.
///
/// A refresh grant usually omits `refresh_token`, so it is optional here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: i64,
}

/// Per-browser authentication record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Epoch seconds after which the access token is considered expired.
    pub expires_at: i64,
    /// Epoch seconds when the session was created or the login restarted.
    pub created_at: i64,
    /// OAuth `state` issued by `/` and expected back on `/callback`.
    pub oauth_state: Option<String>,
    /// Age an expired `/recommendations` call asked for, used once by the
    /// following refresh.
    pub pending_age: Option<u32>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// `true` once `now` is past `expires_at`.
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// The parts of a track the pipeline carries between steps.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRef {
    pub name: String,
    pub uri: String,
    /// Bare track id, taken from `uri` when it is a `spotify:track:` URI.
    pub id: String,
}

/// Target values for the recommendations request, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatureTarget {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
}

/// Track object as returned by the Web API (only the fields we use).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    /// `spotify:track:<id>`, or a `spotify:local:` URI for local files.
    pub uri: String,
}

/// `GET /me/top/tracks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopTracksResponse {
    pub items: Vec<Track>,
}

/// `GET /recommendations`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub tracks: Vec<Track>,
}

/// Audio features of a single track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: String,
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
}

/// `GET /audio-features?ids=...`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFeaturesResponse {
    /// Unknown track ids come back as `null`.
    pub audio_features: Vec<Option<AudioFeatures>>,
}

/// `GET /me`, used for the user id the playlist is created under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
}

/// Body of `POST /users/{user_id}/playlists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
}

/// One page of `GET /me/playlists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserPlaylistsResponse {
    pub items: Vec<Playlist>,
}

/// Body of `POST /playlists/{playlist_id}/tracks`, at most 100 URIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistResponse {
    pub snapshot_id: String,
}

/// A playlist the pipeline created, with its public URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub name: String,
    pub url: String,
}
