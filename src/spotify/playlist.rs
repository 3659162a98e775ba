use super::{SpotifyClient, SpotifyError};
use crate::types::{
    AddTrackToPlaylistRequest, AddTrackToPlaylistResponse, CreatePlaylistRequest,
    GetUserPlaylistsResponse, Playlist, UserProfile,
};

pub const PLAYLIST_DESCRIPTION: &str = "Made by agetracks";

// Spotify rejects more than 100 uris per add request.
const MAX_TRACKS_PER_REQUEST: usize = 100;

impl SpotifyClient {
    pub async fn current_user(&self) -> Result<UserProfile, SpotifyError> {
        self.get("me", &[]).await
    }

    /// Creates a public playlist for `user_id`.
    pub async fn create_playlist(&self, user_id: &str, name: &str) -> Result<Playlist, SpotifyError> {
        let body = CreatePlaylistRequest {
            name: name.to_string(),
            description: PLAYLIST_DESCRIPTION.to_string(),
            public: true,
        };

        self.post(&format!("users/{}/playlists", user_id), &body)
            .await
    }

    /// Lists the first page of the current user's playlists, newest first.
    pub async fn user_playlists(&self) -> Result<Vec<Playlist>, SpotifyError> {
        let res: GetUserPlaylistsResponse = self.get("me/playlists", &[]).await?;
        Ok(res.items)
    }

    /// Adds `uris` to the playlist and returns the last snapshot id.
    pub async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<String, SpotifyError> {
        let path = format!("playlists/{}/tracks", playlist_id);
        let mut snapshot_id = String::new();

        for chunk in uris.chunks(MAX_TRACKS_PER_REQUEST) {
            let body = AddTrackToPlaylistRequest {
                uris: chunk.to_vec(),
            };
            let res: AddTrackToPlaylistResponse = self.post(&path, &body).await?;
            snapshot_id = res.snapshot_id;
        }

        Ok(snapshot_id)
    }
}

/// Picks the playlist named `name` out of a listing.
///
/// Several playlists may share the name; the one with `created_id` wins when
/// present, otherwise the first match in listing order.
pub fn select_playlist<'a>(
    playlists: &'a [Playlist],
    name: &str,
    created_id: Option<&str>,
) -> Option<&'a Playlist> {
    let mut matches = playlists.iter().filter(|p| p.name == name);
    let first = matches.next()?;

    if let Some(created_id) = created_id {
        if first.id == created_id {
            return Some(first);
        }
        if let Some(created) = matches.find(|p| p.id == created_id) {
            return Some(created);
        }
    }

    Some(first)
}
