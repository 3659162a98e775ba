use agetracks::management::{EXPIRED_GRACE_SECS, PENDING_TTL_SECS, SESSION_COOKIE, SessionManager};
use agetracks::openai::{ModelError, audio_features_prompt, parse_audio_features};
use agetracks::spotify::playlist::select_playlist;
use agetracks::types::{Playlist, Session, Track};
use agetracks::utils::*;

fn playlist(id: &str, name: &str) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: name.to_string(),
    }
}

#[test]
fn test_generate_random_string() {
    let value = generate_random_string(64);

    assert_eq!(value.len(), 64);
    assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(value, generate_random_string(64));
}

#[test]
fn test_sign_and_verify() {
    let signature = sign("secret", "session-id");

    assert!(verify_signature("secret", "session-id", &signature));
    assert!(!verify_signature("other-secret", "session-id", &signature));
    assert!(!verify_signature("secret", "session-id2", &signature));
    assert!(!verify_signature("secret", "session-id", ""));
    assert!(
        signature
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
}

#[test]
fn test_sign_is_hmac_sha256() {
    assert_eq!(
        sign("key", "The quick brown fox jumps over the lazy dog"),
        "97yD9DBThCSxMpjmqm-xQ-9NWaFJRhdZl0edvC0aPNg"
    );
    assert!(!verify_signature("secret", "session-id", "not base64!"));
}

#[test]
fn test_track_id_from_uri() {
    assert_eq!(
        track_id_from_uri("spotify:track:4uLU6hMCjMI75M1A2tKUQC"),
        Some("4uLU6hMCjMI75M1A2tKUQC")
    );
    assert_eq!(track_id_from_uri("spotify:episode:abc"), None);
    assert_eq!(track_id_from_uri("spotify:track:"), None);
}

#[test]
fn test_to_track_ref_falls_back_to_id() {
    let local = Track {
        id: "abc".to_string(),
        name: "Local".to_string(),
        uri: "spotify:local:::Local:180".to_string(),
    };

    let track = to_track_ref(&local);
    assert_eq!(track.id, "abc");
    assert_eq!(track.uri, "spotify:local:::Local:180");
}

#[test]
fn test_playlist_name_and_url() {
    assert_eq!(playlist_name(30), "Age 30 recommendations");
    assert_eq!(
        playlist_url("https://open.spotify.com/playlist/", "pl1"),
        "https://open.spotify.com/playlist/pl1"
    );
}

#[test]
fn test_strip_code_fence() {
    assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    assert_eq!(strip_code_fence("```\n{}\n```\n"), "{}");
    assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
}

#[test]
fn test_strip_one_line_code_fence() {
    assert_eq!(strip_code_fence("```json {\"a\": 1}```"), "{\"a\": 1}");
    assert_eq!(strip_code_fence("```{\"a\": 1}```"), "{\"a\": 1}");

    let target = parse_audio_features(
        r#"```json {"audio_features": {"danceability": 0.1, "energy": 0.2, "valence": 0.3}}```"#,
    )
    .unwrap();
    assert_eq!(target.valence, 0.3);
}

#[test]
fn test_parse_audio_features() {
    let target = parse_audio_features(
        r#"{"audio_features": {"danceability": 0.65, "energy": 0.7, "valence": 0.55}}"#,
    )
    .unwrap();

    assert_eq!(target.danceability, 0.65);
    assert_eq!(target.energy, 0.7);
    assert_eq!(target.valence, 0.55);
}

#[test]
fn test_parse_audio_features_does_not_default_missing_values() {
    let err = parse_audio_features(r#"{"audio_features": {"danceability": 0.65, "energy": 0.7}}"#)
        .unwrap_err();

    assert!(matches!(err, ModelError::MissingKey { key: "valence", .. }));
}

#[test]
fn test_parse_audio_features_rejects_non_numeric_values() {
    let err = parse_audio_features(
        r#"{"audio_features": {"danceability": "high", "energy": 0.7, "valence": 0.5}}"#,
    )
    .unwrap_err();

    assert!(matches!(err, ModelError::MissingKey { key: "danceability", .. }));
}

#[test]
fn test_audio_features_prompt_mentions_age_and_key() {
    let prompt = audio_features_prompt(67);

    assert!(prompt.contains("typical 67 year-old"));
    assert!(prompt.contains("'audio_features'"));
}

#[test]
fn test_select_playlist_prefers_created_id() {
    let playlists = vec![
        playlist("a", "Mix"),
        playlist("b", "Age 30 recommendations"),
        playlist("c", "Age 30 recommendations"),
    ];

    let selected = select_playlist(&playlists, "Age 30 recommendations", Some("c")).unwrap();
    assert_eq!(selected.id, "c");

    let selected = select_playlist(&playlists, "Age 30 recommendations", Some("zzz")).unwrap();
    assert_eq!(selected.id, "b");

    let selected = select_playlist(&playlists, "Age 30 recommendations", None).unwrap();
    assert_eq!(selected.id, "b");

    assert!(select_playlist(&playlists, "Age 31 recommendations", None).is_none());
}

#[test]
fn test_session_expiry() {
    let session = Session {
        access_token: Some("t".to_string()),
        expires_at: 1_000,
        ..Session::default()
    };

    assert!(session.is_authenticated());
    assert!(!session.is_expired(1_000));
    assert!(session.is_expired(1_001));
    assert!(!Session::default().is_authenticated());
}

#[tokio::test]
async fn test_session_manager_cookie_roundtrip() {
    let manager = SessionManager::new("secret".to_string());
    let id = manager.create(Session::default()).await;

    let header = format!("theme=dark; {}={}", SESSION_COOKIE, manager.cookie_value(&id));
    assert_eq!(manager.session_id_from_cookie(&header), Some(id.clone()));

    let other = SessionManager::new("another-secret".to_string());
    assert_eq!(other.session_id_from_cookie(&header), None);
    assert_eq!(manager.session_id_from_cookie("theme=dark"), None);

    manager.remove(&id).await;
    assert!(manager.get(&id).await.is_none());
}

#[tokio::test]
async fn test_session_manager_drops_stale_sessions() {
    let manager = SessionManager::new("secret".to_string());
    let now = now_timestamp();

    let fresh = manager.create(Session::default()).await;
    let abandoned = manager.create(Session::default()).await;
    let signed_in = manager
        .create(Session {
            access_token: Some("t".to_string()),
            expires_at: now - 60,
            ..Session::default()
        })
        .await;
    let long_gone = manager
        .create(Session {
            access_token: Some("t".to_string()),
            expires_at: now - EXPIRED_GRACE_SECS - 60,
            ..Session::default()
        })
        .await;

    let mut session = manager.get(&abandoned).await.unwrap();
    session.created_at = now - PENDING_TTL_SECS - 1;
    manager.put(&abandoned, session).await;

    assert_eq!(manager.count().await, 4);
    assert_eq!(manager.purge_expired(now).await, 2);
    assert!(manager.get(&fresh).await.is_some());
    assert!(manager.get(&signed_in).await.is_some());
    assert!(manager.get(&abandoned).await.is_none());
    assert!(manager.get(&long_gone).await.is_none());
}

#[tokio::test]
async fn test_session_manager_evicts_unauthenticated_first() {
    let manager = SessionManager::with_capacity("secret".to_string(), 2);
    let signed_in = manager
        .create(Session {
            access_token: Some("t".to_string()),
            expires_at: now_timestamp() + 3600,
            ..Session::default()
        })
        .await;
    let pending = manager.create(Session::default()).await;

    let newest = manager.create(Session::default()).await;

    assert_eq!(manager.count().await, 2);
    assert!(manager.get(&pending).await.is_none());
    assert!(manager.get(&signed_in).await.is_some());
    assert!(manager.get(&newest).await.is_some());
}
