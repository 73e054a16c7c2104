mod common;

use axum::routing::get;
use serde_json::json;
use std::time::Duration;

use common::{TEST_TIMEOUT, TITLE};
use tunebox::net::NetworkContext;
use tunebox::resolver::adapters::{MirrorFleet, MirrorProbe};
use tunebox::resolver::{
    AdapterError, BackendAdapter, BackendKind, FleetRacer, MediaKind, MirrorClass,
};

fn probe(timeout: Duration) -> MirrorProbe {
    MirrorProbe::new(NetworkContext::direct(common::http()), timeout, "mp4a")
}

fn fleet(backend: BackendKind, bases: &[String], class: MirrorClass, width: usize) -> MirrorFleet {
    MirrorFleet::new(
        backend,
        common::endpoints(bases, class),
        FleetRacer::new(width, TEST_TIMEOUT),
        probe(TEST_TIMEOUT),
    )
}

fn dead_mirrors(base: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{base}/dead-{i}")).collect()
}

#[tokio::test]
async fn test_exhausted_fleet_lists_every_consulted_endpoint() {
    let base = common::spawn_dead().await;
    let mirrors = dead_mirrors(&base, 3);
    let fleet = fleet(BackendKind::MirrorFleetA, &mirrors, MirrorClass::Piped, 3);

    let err = fleet.resolve("abc123", MediaKind::Audio).await.unwrap_err();
    let AdapterError::FleetExhausted(failures) = err else {
        panic!("expected fleet exhaustion, got {err:?}");
    };

    assert_eq!(failures.len(), 3);
    for mirror in &mirrors {
        assert!(
            failures.iter().any(|f| f.starts_with(&format!("{mirror}: "))),
            "no failure recorded for {mirror}"
        );
    }
}

#[tokio::test]
async fn test_fleet_consults_at_most_race_width() {
    let base = common::spawn_dead().await;
    let mirrors = dead_mirrors(&base, 8);
    let fleet = fleet(BackendKind::MirrorFleetA, &mirrors, MirrorClass::Piped, 3);

    let err = fleet.resolve("abc123", MediaKind::Audio).await.unwrap_err();
    assert_eq!(err.messages().len(), 3);
}

#[tokio::test]
async fn test_working_piped_mirror_wins_among_dead_ones() {
    let base = common::spawn_with(|base| {
        common::media_routes()
            .route("/live/streams/{id}", common::json_get(common::piped_json(base)))
    })
    .await;
    let mut mirrors = dead_mirrors(&base, 2);
    mirrors.push(format!("{base}/live"));
    let fleet = fleet(BackendKind::MirrorFleetA, &mirrors, MirrorClass::Piped, 3);

    let candidate = fleet.resolve("abc123", MediaKind::Audio).await.unwrap();
    assert_eq!(candidate.source_url, format!("{base}/media/audio.m4a"));
    assert_eq!(candidate.title, TITLE);
    assert_eq!(candidate.origin, BackendKind::MirrorFleetA);
}

#[tokio::test]
async fn test_invidious_mirror_serves_muxed_video() {
    let base = common::spawn_with(|base| {
        common::media_routes().route(
            "/inv/api/v1/videos/{id}",
            common::json_get(common::invidious_json(base)),
        )
    })
    .await;
    let fleet = fleet(
        BackendKind::MirrorFleetB,
        &[format!("{base}/inv")],
        MirrorClass::Invidious,
        1,
    );

    let candidate = fleet.resolve("abc123", MediaKind::Video).await.unwrap();
    assert_eq!(candidate.source_url, format!("{base}/media/video.mp4"));
    assert_eq!(candidate.origin, BackendKind::MirrorFleetB);
}

#[tokio::test]
async fn test_empty_listing_counts_as_failure() {
    let base = common::spawn_with(|_| {
        axum::Router::new().route(
            "/empty/streams/{id}",
            common::json_get(json!({ "title": "Nothing", "audioStreams": [], "videoStreams": [] })),
        )
    })
    .await;
    let fleet = fleet(
        BackendKind::MirrorFleetA,
        &[format!("{base}/empty")],
        MirrorClass::Piped,
        1,
    );

    let err = fleet.resolve("abc123", MediaKind::Audio).await.unwrap_err();
    let messages = err.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("empty stream list"), "got {}", messages[0]);
}

#[tokio::test]
async fn test_slow_mirror_is_cut_off_by_probe_timeout() {
    let base = common::spawn_with(|base| {
        let listing = common::piped_json(base);
        axum::Router::new().route(
            "/slow/streams/{id}",
            get(move || {
                let listing = listing.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    axum::Json(listing)
                }
            }),
        )
    })
    .await;
    let fleet = MirrorFleet::new(
        BackendKind::MirrorFleetA,
        common::endpoints(&[format!("{base}/slow")], MirrorClass::Piped),
        FleetRacer::new(1, Duration::from_millis(200)),
        probe(Duration::from_secs(10)),
    );

    let started = std::time::Instant::now();
    let err = fleet.resolve("abc123", MediaKind::Audio).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(err.messages()[0].contains("timed out"));
}

#[tokio::test]
async fn test_empty_pool_is_unreachable() {
    let fleet = fleet(BackendKind::MirrorFleetB, &[], MirrorClass::Invidious, 4);

    let err = fleet.resolve("abc123", MediaKind::Audio).await.unwrap_err();
    assert!(matches!(err, AdapterError::Unreachable(_)));
}

#[tokio::test]
async fn test_chain_moves_past_exhausted_fleet() {
    let base = common::spawn_with(|base| {
        common::media_routes().route(
            "/invidious/api/v1/videos/{id}",
            common::json_get(common::invidious_json(base)),
        )
    })
    .await;
    let mut targets = common::ChainTargets::all(&base);
    targets.piped = dead_mirrors(&base, 3);
    let chain = targets.build(&common::http());

    let run = chain.run("abc123", MediaKind::Audio).await;

    let candidate = run.candidate.expect("fleet B resolves");
    assert_eq!(candidate.origin, BackendKind::MirrorFleetB);
    assert_eq!(run.reports.len(), 3);
    assert_eq!(run.reports[2].backend, BackendKind::MirrorFleetA);
    assert_eq!(run.reports[2].errors.len(), 3);
}
