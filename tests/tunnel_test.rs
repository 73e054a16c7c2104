mod common;

use axum::{
    body::Body,
    http::{HeaderMap, header},
    routing::get,
};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use common::{AUDIO_BYTES, ChainTargets, TEST_TIMEOUT};
use tunebox::resolver::{BackendKind, MediaKind};
use tunebox::tunnel::{RelayRequest, StreamTunnel, TransferProgress, TunnelError};

fn tunnel(chain_base: &str) -> StreamTunnel {
    let http = common::http();
    let chain = ChainTargets::all(chain_base).build(&http);
    let metrics = Arc::clone(chain.metrics());
    StreamTunnel::new(http, Arc::new(chain), TEST_TIMEOUT, metrics)
}

fn direct(url: String, kind: MediaKind) -> RelayRequest {
    RelayRequest {
        kind: Some(kind),
        direct_url: Some(url),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_upstream_receives_spoofed_headers() {
    let seen: Arc<Mutex<Option<HeaderMap>>> = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&seen);
    let base = common::spawn_with(move |_| {
        axum::Router::new().route(
            "/media/audio.m4a",
            get(move |headers: HeaderMap| {
                let recorder = Arc::clone(&recorder);
                async move {
                    *recorder.lock().unwrap() = Some(headers);
                    Bytes::from_static(AUDIO_BYTES)
                }
            }),
        )
    })
    .await;
    let tunnel = tunnel(&base);

    let relay = tunnel
        .relay(&direct(format!("{base}/media/audio.m4a"), MediaKind::Audio))
        .await
        .unwrap();
    assert_eq!(relay.origin(), BackendKind::Direct);

    let headers = seen.lock().unwrap().take().expect("upstream was called");
    assert_eq!(headers[header::ORIGIN], "https://www.youtube.com");
    assert_eq!(headers[header::REFERER], "https://www.youtube.com/");
    assert_eq!(headers[header::RANGE], "bytes=0-");
    assert_eq!(
        headers[header::USER_AGENT],
        common::http().user_agent()
    );
}

#[tokio::test]
async fn test_collect_reports_progress_to_completion() {
    let base = common::spawn_with(|_| common::media_routes()).await;
    let tunnel = tunnel(&base);

    let relay = tunnel
        .relay(&direct(format!("{base}/media/audio.m4a"), MediaKind::Audio))
        .await
        .unwrap();
    assert_eq!(relay.content_length(), Some(AUDIO_BYTES.len() as u64));

    let (tx, rx) = watch::channel(TransferProgress::default());
    let data = relay.collect(&tx).await.unwrap();

    assert_eq!(data.as_ref(), AUDIO_BYTES);
    let last = *rx.borrow();
    assert_eq!(last.bytes_read, AUDIO_BYTES.len() as u64);
    assert_eq!(last.total_bytes, Some(AUDIO_BYTES.len() as u64));
    assert_eq!(last.percent(), Some(100));

    let snapshot = tunnel.chain().metrics().snapshot();
    assert_eq!(snapshot.relays_started, 1);
    assert_eq!(snapshot.bytes_relayed, AUDIO_BYTES.len() as u64);
}

#[tokio::test]
async fn test_chunked_upstream_has_unknown_total() {
    let base = common::spawn_with(|_| {
        axum::Router::new().route(
            "/live",
            get(|| async {
                let chunks = vec![
                    Ok::<_, std::io::Error>(Bytes::from_static(b"first-")),
                    Ok(Bytes::from_static(b"second-")),
                    Ok(Bytes::from_static(b"third")),
                ];
                Body::from_stream(futures::stream::iter(chunks))
            }),
        )
    })
    .await;
    let tunnel = tunnel(&base);

    let relay = tunnel
        .relay(&direct(format!("{base}/live"), MediaKind::Audio))
        .await
        .unwrap();
    assert_eq!(relay.content_length(), None);
    assert_eq!(relay.headers()[header::CONTENT_TYPE], "audio/mpeg");

    let (tx, rx) = watch::channel(TransferProgress::default());
    let data = relay.collect(&tx).await.unwrap();

    assert_eq!(data.as_ref(), b"first-second-third");
    assert_eq!(rx.borrow().total_bytes, None);
    assert_eq!(rx.borrow().percent(), None);
}

#[tokio::test]
async fn test_resolved_but_unfetchable_stream_is_a_relay_failure() {
    // Player points at a URL the upstream does not serve
    let base = common::spawn_with(|base| {
        let mut player = common::player_json(base);
        player["streamingData"]["adaptiveFormats"][0]["url"] =
            format!("{base}/media/gone.m4a").into();
        axum::Router::new().route("/player", common::json_post(player))
    })
    .await;
    let tunnel = tunnel(&base);

    let err = tunnel
        .relay(&RelayRequest::for_id("abc123", MediaKind::Audio))
        .await
        .unwrap_err();

    assert!(matches!(err, TunnelError::StreamRelayFailure(_)), "got {err:?}");
    assert_eq!(tunnel.chain().metrics().snapshot().relays_failed, 1);
}

#[tokio::test]
async fn test_locate_moves_no_bytes_and_names_the_file() {
    let base = common::spawn_with(|base| {
        common::media_routes().route("/player", common::json_post(common::player_json(base)))
    })
    .await;
    let tunnel = tunnel(&base);

    let located = tunnel
        .locate(&RelayRequest::for_id("abc123", MediaKind::Video))
        .await
        .unwrap();

    assert_eq!(located.url, format!("{base}/media/video.mp4"));
    assert_eq!(located.filename, "Mock Song.mp4");
    assert_eq!(tunnel.chain().metrics().snapshot().bytes_relayed, 0);
}

#[tokio::test]
async fn test_nothing_to_relay_is_missing_source() {
    let base = common::spawn_dead().await;
    let tunnel = tunnel(&base);

    let err = tunnel.relay(&RelayRequest::default()).await.unwrap_err();
    assert!(matches!(err, TunnelError::MissingSource));
}

#[tokio::test]
async fn test_proxy_rejects_other_schemes() {
    let base = common::spawn_dead().await;
    let tunnel = tunnel(&base);

    let err = tunnel.proxy("ftp://mirror.example/x").await.unwrap_err();
    assert!(matches!(err, TunnelError::InvalidUrl(_)));
}
