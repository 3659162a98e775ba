use super::{SpotifyClient, SpotifyError};
use crate::types::{
    AudioFeatureTarget, AudioFeaturesResponse, RecommendationsResponse, TopTracksResponse, Track,
};

pub const TOP_TRACKS_TIME_RANGE: &str = "medium_term";

impl SpotifyClient {
    /// Retrieves the user's top tracks for the given time range.
    ///
    /// `time_range` is one of `short_term`, `medium_term` or `long_term`.
    pub async fn top_tracks(&self, time_range: &str, limit: u32) -> Result<Vec<Track>, SpotifyError> {
        let res: TopTracksResponse = self
            .get(
                "me/top/tracks",
                &[
                    ("time_range", time_range.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(res.items)
    }

    /// Requests recommendations seeded by `seed_ids` and tuned toward `target`.
    ///
    /// Spotify accepts at most five seeds in total.
    pub async fn recommendations(
        &self,
        seed_ids: &[String],
        target: &AudioFeatureTarget,
        limit: u32,
    ) -> Result<Vec<Track>, SpotifyError> {
        let res: RecommendationsResponse = self
            .get(
                "recommendations",
                &[
                    ("seed_tracks", seed_ids.join(",")),
                    ("limit", limit.to_string()),
                    ("target_danceability", target.danceability.to_string()),
                    ("target_energy", target.energy.to_string()),
                    ("target_valence", target.valence.to_string()),
                ],
            )
            .await?;

        Ok(res.tracks)
    }

    pub async fn audio_features(&self, ids: &[String]) -> Result<AudioFeaturesResponse, SpotifyError> {
        self.get("audio-features", &[("ids", ids.join(","))]).await
    }
}
