mod common;

use axum::{Json, extract::Query, response::Html, routing::get, routing::post};
use serde_json::{Value, json};
use std::collections::HashMap;

use common::{TEST_TIMEOUT, TITLE};
use tunebox::resolver::adapters::{
    DeviceProfile, LibraryExtractor, NativeExtractor, PlayerClient,
};
use tunebox::resolver::{AdapterError, BackendAdapter, BackendKind, MediaKind};

fn native(base: &str, profiles: Vec<DeviceProfile>) -> NativeExtractor {
    NativeExtractor::new(
        PlayerClient::with_endpoint(common::http(), format!("{base}/player")),
        profiles,
        720,
        TEST_TIMEOUT,
    )
}

/// Player that refuses the iOS client and serves every other one
async fn picky_player() -> String {
    common::spawn_with(|base| {
        let player = common::player_json(base);
        common::media_routes().route(
            "/player",
            post(move |Json(body): Json<Value>| {
                let reply = if body["context"]["client"]["clientName"] == "IOS" {
                    json!({ "playabilityStatus": { "status": "UNPLAYABLE", "reason": "Client blocked" } })
                } else {
                    player.clone()
                };
                async move { Json(reply) }
            }),
        )
    })
    .await
}

#[tokio::test]
async fn test_native_tries_profiles_in_order() {
    let base = picky_player().await;
    let extractor = native(&base, vec![DeviceProfile::Ios, DeviceProfile::AndroidVr]);

    let candidate = extractor.resolve("abc123", MediaKind::Video).await.unwrap();

    assert_eq!(candidate.source_url, format!("{base}/media/video.mp4"));
    assert_eq!(candidate.title, TITLE);
    assert_eq!(candidate.origin, BackendKind::Native);
}

#[tokio::test]
async fn test_native_failure_names_every_profile() {
    let base = picky_player().await;
    let extractor = native(&base, vec![DeviceProfile::Ios]);

    let err = extractor.resolve("abc123", MediaKind::Audio).await.unwrap_err();

    let AdapterError::Rejected(message) = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert!(message.starts_with("ios: "), "got {message}");
    assert!(message.contains("UNPLAYABLE (Client blocked)"));
}

#[tokio::test]
async fn test_native_moves_on_when_profile_lacks_the_kind() {
    // iOS answers with muxed video only; the next profile carries audio
    let base = common::spawn_with(|base| {
        let full = common::player_json(base);
        let mut video_only = full.clone();
        video_only["streamingData"]["adaptiveFormats"] = json!([]);
        common::media_routes().route(
            "/player",
            post(move |Json(body): Json<Value>| {
                let reply = if body["context"]["client"]["clientName"] == "IOS" {
                    video_only.clone()
                } else {
                    full.clone()
                };
                async move { Json(reply) }
            }),
        )
    })
    .await;
    let extractor = native(&base, vec![DeviceProfile::Ios, DeviceProfile::AndroidVr]);

    let candidate = extractor.resolve("abc123", MediaKind::Audio).await.unwrap();
    assert_eq!(candidate.source_url, format!("{base}/media/audio.m4a"));
}

#[tokio::test]
async fn test_native_skips_ciphered_formats() {
    let base = common::spawn_with(|_| {
        axum::Router::new().route(
            "/player",
            common::json_post(json!({
                "playabilityStatus": { "status": "OK" },
                "streamingData": {
                    "adaptiveFormats": [{
                        "signatureCipher": "s=abc&url=https%3A%2F%2Fcdn.example%2Fa",
                        "mimeType": "audio/webm; codecs=\"opus\"",
                        "bitrate": 160000
                    }]
                }
            })),
        )
    })
    .await;
    let extractor = native(&base, vec![DeviceProfile::Android]);

    let err = extractor.resolve("abc123", MediaKind::Audio).await.unwrap_err();
    assert!(err.to_string().contains("no usable stream"), "got {err}");
}

#[tokio::test]
async fn test_library_reads_embedded_player_response() {
    let base = common::spawn_with(|base| {
        let player = common::player_json(base);
        common::media_routes().route(
            "/watch",
            get(move |Query(query): Query<HashMap<String, String>>| {
                let page = format!(
                    "<html><script>var ytInitialPlayerResponse = {player};var meta = {{}};</script></html>"
                );
                let verified = query.get("has_verified").map(String::as_str) == Some("1");
                async move {
                    if verified {
                        Ok(Html(page))
                    } else {
                        Err(axum::http::StatusCode::FORBIDDEN)
                    }
                }
            }),
        )
    })
    .await;
    let extractor = LibraryExtractor::with_base(common::http(), format!("{base}/"), TEST_TIMEOUT);

    let audio = extractor.resolve("abc123", MediaKind::Audio).await.unwrap();
    assert_eq!(audio.source_url, format!("{base}/media/audio.m4a"));
    assert_eq!(audio.origin, BackendKind::Library);

    let video = extractor.resolve("abc123", MediaKind::Video).await.unwrap();
    assert_eq!(video.source_url, format!("{base}/media/video.mp4"));
}

#[tokio::test]
async fn test_library_page_without_player_is_malformed() {
    let base = common::spawn_with(|_| {
        axum::Router::new().route("/watch", get(|| async { Html("<html>consent wall</html>") }))
    })
    .await;
    let extractor = LibraryExtractor::with_base(common::http(), base, TEST_TIMEOUT);

    let err = extractor.resolve("abc123", MediaKind::Audio).await.unwrap_err();
    assert!(matches!(err, AdapterError::Malformed(_)), "got {err:?}");
}
