//! The recommendation pipeline: top tracks → model targets → recommendations
//! → playlist.
//!
//! Every step runs strictly after the previous one and either yields a typed
//! value or a [`PipelineError`] naming the step. Nothing is rolled back: once
//! the playlist exists, a later failure is reported as
//! [`PipelineError::TracksNotAdded`] together with the created playlist.

use std::{collections::HashMap, fmt};

use crate::{
    info,
    openai::{ModelError, OpenAiClient},
    spotify::{
        SpotifyClient, SpotifyError,
        playlist::select_playlist,
        tracks::TOP_TRACKS_TIME_RANGE,
    },
    success,
    types::{AudioFeatureTarget, AudioFeaturesResponse, CreatedPlaylist, TrackRef},
    utils, warning,
};

pub const TOP_TRACK_LIMIT: u32 = 5;
pub const RECOMMENDATION_LIMIT: u32 = 25;
pub const FEATURE_SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    TopTracks,
    TargetFeatures,
    Recommendations,
    AudioFeatures,
    CurrentUser,
    CreatePlaylist,
    ListPlaylists,
    AddTracks,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::TopTracks => "top_tracks",
            Step::TargetFeatures => "target_features",
            Step::Recommendations => "recommendations",
            Step::AudioFeatures => "audio_features",
            Step::CurrentUser => "current_user",
            Step::CreatePlaylist => "create_playlist",
            Step::ListPlaylists => "list_playlists",
            Step::AddTracks => "add_tracks",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum PipelineError {
    Spotify { step: Step, source: SpotifyError },
    Model(ModelError),
    NoSeedTracks,
    PlaylistNotFound { name: String },
    /// The playlist was created but filling it failed; it is left empty.
    TracksNotAdded {
        playlist: CreatedPlaylist,
        source: SpotifyError,
    },
}

impl PipelineError {
    pub fn step(&self) -> Step {
        match self {
            PipelineError::Spotify { step, .. } => *step,
            PipelineError::Model(_) => Step::TargetFeatures,
            PipelineError::NoSeedTracks => Step::TopTracks,
            PipelineError::PlaylistNotFound { .. } => Step::ListPlaylists,
            PipelineError::TracksNotAdded { .. } => Step::AddTracks,
        }
    }

    /// The playlist left behind by a partial failure, if any.
    pub fn partial_playlist(&self) -> Option<&CreatedPlaylist> {
        match self {
            PipelineError::TracksNotAdded { playlist, .. } => Some(playlist),
            _ => None,
        }
    }

    /// True when Spotify rejected the access token.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            PipelineError::Spotify { source, .. } | PipelineError::TracksNotAdded { source, .. } => {
                source.is_unauthorized()
            }
            _ => false,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Spotify { step, source } => write!(f, "{} failed: {}", step, source),
            PipelineError::Model(e) => write!(f, "{} failed: {}", Step::TargetFeatures, e),
            PipelineError::NoSeedTracks => {
                write!(f, "no top tracks to seed recommendations with")
            }
            PipelineError::PlaylistNotFound { name } => {
                write!(f, "created playlist '{}' not found in the user's playlists", name)
            }
            PipelineError::TracksNotAdded { playlist, source } => write!(
                f,
                "playlist '{}' ({}) was created but tracks could not be added: {}",
                playlist.name, playlist.id, source
            ),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Spotify { source, .. } | PipelineError::TracksNotAdded { source, .. } => {
                Some(source)
            }
            PipelineError::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        PipelineError::Model(err)
    }
}

trait StepContext<T> {
    fn at(self, step: Step) -> Result<T, PipelineError>;
}

impl<T> StepContext<T> for Result<T, SpotifyError> {
    fn at(self, step: Step) -> Result<T, PipelineError> {
        self.map_err(|source| PipelineError::Spotify { step, source })
    }
}

/// Everything the pipeline learned along the way.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub top_tracks: Vec<TrackRef>,
    pub target: AudioFeatureTarget,
    pub recommended: Vec<TrackRef>,
    /// Name → `[danceability, energy, valence]` for the first recommended tracks.
    pub feature_sample: Vec<(String, [f64; 3])>,
    pub playlist: CreatedPlaylist,
}

pub struct RecommendationPipeline<'a> {
    spotify: &'a SpotifyClient,
    model: &'a OpenAiClient,
    playlist_url_base: &'a str,
}

impl<'a> RecommendationPipeline<'a> {
    pub fn new(spotify: &'a SpotifyClient, model: &'a OpenAiClient, playlist_url_base: &'a str) -> Self {
        RecommendationPipeline {
            spotify,
            model,
            playlist_url_base,
        }
    }

    pub async fn run(&self, age: u32) -> Result<PipelineReport, PipelineError> {
        let top_tracks = self.seed_tracks().await?;
        let target = self.target_for_age(age).await?;
        let recommended = self.recommend(&top_tracks, &target).await?;
        let feature_sample = self.sample_audio_features(&recommended).await?;
        let playlist = self.create_playlist(age).await?;
        self.populate(&playlist, &recommended).await?;

        success!("Playlist '{}' ready at {}", playlist.name, playlist.url);

        Ok(PipelineReport {
            top_tracks,
            target,
            recommended,
            feature_sample,
            playlist,
        })
    }

    async fn seed_tracks(&self) -> Result<Vec<TrackRef>, PipelineError> {
        let tracks = self
            .spotify
            .top_tracks(TOP_TRACKS_TIME_RANGE, TOP_TRACK_LIMIT)
            .await
            .at(Step::TopTracks)?;

        if tracks.is_empty() {
            return Err(PipelineError::NoSeedTracks);
        }

        let tracks: Vec<TrackRef> = tracks.iter().map(utils::to_track_ref).collect();
        info!(
            "Top tracks: {}",
            tracks
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(tracks)
    }

    async fn target_for_age(&self, age: u32) -> Result<AudioFeatureTarget, PipelineError> {
        let target = self.model.audio_features_for_age(age).await?;
        info!(
            "Targets for age {}: danceability={} energy={} valence={}",
            age, target.danceability, target.energy, target.valence
        );
        Ok(target)
    }

    async fn recommend(
        &self,
        seeds: &[TrackRef],
        target: &AudioFeatureTarget,
    ) -> Result<Vec<TrackRef>, PipelineError> {
        let seed_ids: Vec<String> = seeds.iter().map(|t| t.id.clone()).collect();
        let tracks = self
            .spotify
            .recommendations(&seed_ids, target, RECOMMENDATION_LIMIT)
            .await
            .at(Step::Recommendations)?;

        info!("Received {} recommended tracks", tracks.len());
        Ok(tracks.iter().map(utils::to_track_ref).collect())
    }

    async fn sample_audio_features(
        &self,
        tracks: &[TrackRef],
    ) -> Result<Vec<(String, [f64; 3])>, PipelineError> {
        if tracks.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
        let features = self
            .spotify
            .audio_features(&ids)
            .await
            .at(Step::AudioFeatures)?;

        let sample = feature_sample(tracks, &features, FEATURE_SAMPLE_SIZE);
        for (name, [danceability, energy, valence]) in &sample {
            info!("  {}: [{}, {}, {}]", name, danceability, energy, valence);
        }
        Ok(sample)
    }

    async fn create_playlist(&self, age: u32) -> Result<CreatedPlaylist, PipelineError> {
        let name = utils::playlist_name(age);

        let user = self.spotify.current_user().await.at(Step::CurrentUser)?;
        let created = self
            .spotify
            .create_playlist(&user.id, &name)
            .await
            .at(Step::CreatePlaylist)?;
        info!("Created playlist '{}' for user {}", name, user.id);

        let playlists = self
            .spotify
            .user_playlists()
            .await
            .at(Step::ListPlaylists)?;
        let selected = select_playlist(&playlists, &name, Some(created.id.as_str()))
            .ok_or_else(|| PipelineError::PlaylistNotFound { name: name.clone() })?;

        if selected.id != created.id {
            warning!(
                "Playlist listing returned {} instead of the created {}",
                selected.id,
                created.id
            );
        }

        Ok(CreatedPlaylist {
            id: selected.id.clone(),
            name,
            url: utils::playlist_url(self.playlist_url_base, &selected.id),
        })
    }

    async fn populate(&self, playlist: &CreatedPlaylist, tracks: &[TrackRef]) -> Result<(), PipelineError> {
        let uris: Vec<String> = tracks.iter().map(|t| t.uri.clone()).collect();
        match self.spotify.add_tracks(&playlist.id, &uris).await {
            Ok(_) => {
                info!("Added {} tracks to '{}'", uris.len(), playlist.name);
                Ok(())
            }
            Err(source) => {
                warning!("Playlist '{}' was left empty: {}", playlist.name, source);
                Err(PipelineError::TracksNotAdded {
                    playlist: playlist.clone(),
                    source,
                })
            }
        }
    }
}

/// Pairs the first `limit` tracks with their audio features.
///
/// Tracks Spotify returned no features for are skipped.
pub fn feature_sample(
    tracks: &[TrackRef],
    features: &AudioFeaturesResponse,
    limit: usize,
) -> Vec<(String, [f64; 3])> {
    let by_id: HashMap<&str, [f64; 3]> = features
        .audio_features
        .iter()
        .flatten()
        .map(|f| (f.id.as_str(), [f.danceability, f.energy, f.valence]))
        .collect();

    tracks
        .iter()
        .take(limit)
        .filter_map(|t| by_id.get(t.id.as_str()).map(|v| (t.name.clone(), *v)))
        .collect()
}
