#![allow(dead_code)]

use axum::{
    Json, Router,
    http::header,
    routing::{MethodRouter, get, post},
};
use bytes::Bytes;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use tunebox::net::{HttpClient, HttpConfig, NetworkContext};
use tunebox::observability::Metrics;
use tunebox::resolver::adapters::{
    DeviceProfile, LibraryExtractor, MirrorFleet, MirrorProbe, NativeExtractor, PlayerClient,
};
use tunebox::resolver::{
    BackendAdapter, BackendKind, FleetRacer, MirrorClass, MirrorEndpoint, PhaseChain,
};

pub const AUDIO_BYTES: &[u8] = b"ID3\x04\x00fake-audio-payload-0123456789";
pub const VIDEO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42fake-video-payload";
pub const TITLE: &str = "Mock Song";

pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Bind an ephemeral port, build the app with its base URL, serve it in the background
pub async fn spawn_with<F>(build: F) -> String
where
    F: FnOnce(&str) -> Router,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock upstream");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));
    let app = build(&base);

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock upstream crashed");
    });

    base
}

/// An upstream that knows no routes; every request is a 404
pub async fn spawn_dead() -> String {
    spawn_with(|_| Router::new()).await
}

pub fn http() -> HttpClient {
    HttpClient::new(HttpConfig::default()).expect("Failed to build HTTP client")
}

pub fn json_get(value: Value) -> MethodRouter {
    get(move || {
        let value = value.clone();
        async move { Json(value) }
    })
}

pub fn json_post(value: Value) -> MethodRouter {
    post(move || {
        let value = value.clone();
        async move { Json(value) }
    })
}

/// `/media/audio.m4a` and `/media/video.mp4`
pub fn media_routes() -> Router {
    Router::new()
        .route(
            "/media/audio.m4a",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "audio/mp4")],
                    Bytes::from_static(AUDIO_BYTES),
                )
            }),
        )
        .route(
            "/media/video.mp4",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "video/mp4")],
                    Bytes::from_static(VIDEO_BYTES),
                )
            }),
        )
}

/// A playable `/player` document whose streams point at `media_routes`
pub fn player_json(base: &str) -> Value {
    json!({
        "playabilityStatus": { "status": "OK" },
        "videoDetails": { "title": TITLE },
        "streamingData": {
            "formats": [{
                "url": format!("{base}/media/video.mp4"),
                "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                "bitrate": 900000,
                "height": 720
            }],
            "adaptiveFormats": [{
                "url": format!("{base}/media/audio.m4a"),
                "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                "bitrate": "128000"
            }]
        }
    })
}

pub fn piped_json(base: &str) -> Value {
    json!({
        "title": TITLE,
        "audioStreams": [{
            "url": format!("{base}/media/audio.m4a"),
            "mimeType": "audio/mp4",
            "codec": "mp4a.40.2",
            "bitrate": 128000
        }],
        "videoStreams": [{
            "url": format!("{base}/media/video.mp4"),
            "quality": "720p",
            "mimeType": "video/mp4",
            "videoOnly": false
        }]
    })
}

pub fn invidious_json(base: &str) -> Value {
    json!({
        "title": TITLE,
        "adaptiveFormats": [{
            "url": format!("{base}/media/audio.m4a"),
            "type": "audio/mp4; codecs=\"mp4a.40.2\"",
            "bitrate": "128000"
        }],
        "formatStreams": [{
            "url": format!("{base}/media/video.mp4"),
            "type": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
            "qualityLabel": "720p"
        }]
    })
}

pub fn endpoints(bases: &[String], class: MirrorClass) -> Arc<[MirrorEndpoint]> {
    bases
        .iter()
        .map(|b| MirrorEndpoint::new(b.clone(), class))
        .collect::<Vec<_>>()
        .into()
}

/// Bases and wiring for a full four-phase chain against local upstreams
pub struct ChainTargets {
    pub player: String,
    pub watch: String,
    pub piped: Vec<String>,
    pub invidious: Vec<String>,
}

impl ChainTargets {
    /// Every phase pointed at the same base
    pub fn all(base: &str) -> Self {
        Self {
            player: format!("{base}/player"),
            watch: base.to_string(),
            piped: vec![format!("{base}/piped")],
            invidious: vec![format!("{base}/invidious")],
        }
    }

    pub fn build(&self, http: &HttpClient) -> PhaseChain {
        let racer = FleetRacer::new(3, TEST_TIMEOUT);
        let probe = MirrorProbe::new(NetworkContext::direct(http.clone()), TEST_TIMEOUT, "mp4a");

        let phases: Vec<Arc<dyn BackendAdapter>> = vec![
            Arc::new(NativeExtractor::new(
                PlayerClient::with_endpoint(http.clone(), self.player.clone()),
                vec![DeviceProfile::Ios],
                720,
                TEST_TIMEOUT,
            )),
            Arc::new(LibraryExtractor::with_base(
                http.clone(),
                self.watch.clone(),
                TEST_TIMEOUT,
            )),
            Arc::new(MirrorFleet::new(
                BackendKind::MirrorFleetA,
                endpoints(&self.piped, MirrorClass::Piped),
                racer.clone(),
                probe.clone(),
            )),
            Arc::new(MirrorFleet::new(
                BackendKind::MirrorFleetB,
                endpoints(&self.invidious, MirrorClass::Invidious),
                racer,
                probe,
            )),
        ];

        phases
            .into_iter()
            .fold(PhaseChain::new(Arc::new(Metrics::new())), |chain, phase| {
                chain.with_phase(phase)
            })
    }
}
