//! Concurrency and isolation tests for the request pipeline
//!
//! Many requests run at once against the same pipeline. Each must see only its
//! own workspace, get back only its own artifact, and leave nothing behind.

mod common;

use common::{
    FetchGate, ScriptedBackend, assert_no_residue, collect_events_for, scripted_pipeline,
};
use media_relay::{DeliveryOutcome, ErrorKind, Event, MediaKind, Request};
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_get_their_own_artifacts() {
    let (pipeline, temp_dir) = scripted_pipeline(ScriptedBackend::succeeding(
        Duration::from_millis(50),
    ));

    let mut handles = Vec::new();
    for i in 0..24 {
        let pipeline = pipeline.clone();
        let request = if i % 2 == 0 {
            Request::video(format!("https://example.com/watch?v={i}"))
        } else {
            Request::audio(format!("https://example.com/watch?v={i}"))
        };
        handles.push(tokio::spawn(async move {
            let url = request.url.clone();
            let kind = request.kind;
            (url, kind, pipeline.handle(request).await)
        }));
    }

    for handle in handles {
        let (url, kind, outcome) = handle.await.unwrap();
        match outcome {
            DeliveryOutcome::Delivered(payload) => {
                assert_eq!(payload.kind, kind);
                // The fixture writes the request's own URL into the artifact
                assert_eq!(payload.bytes, url.as_bytes(), "got another request's file");
            }
            DeliveryOutcome::Rejected(kind) => panic!("{url} was rejected as {kind}"),
        }
    }

    assert_no_residue(&temp_dir.path().join("workspaces"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_use_distinct_workspaces() {
    const REQUESTS: usize = 8;
    let gate = FetchGate::new(REQUESTS);
    let (pipeline, temp_dir) = scripted_pipeline(
        ScriptedBackend::succeeding(Duration::from_millis(10)).gated(gate.clone()),
    );
    let root = temp_dir.path().join("workspaces");

    let requests: Vec<Request> = (0..REQUESTS)
        .map(|i| Request::video(format!("https://example.com/{i}")))
        .collect();
    let ids: HashSet<_> = requests.iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), requests.len());

    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.handle(request).await })
        })
        .collect();

    // Every fetch is now running, so every workspace exists side by side
    tokio::time::timeout(Duration::from_secs(10), gate.arrived.wait())
        .await
        .expect("all fetches should start");
    let live: HashSet<String> = std::fs::read_dir(&root)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    let expected: HashSet<String> = ids.iter().map(|id| id.to_string()).collect();
    assert_eq!(live, expected);
    gate.release.wait().await;

    for handle in handles {
        assert!(handle.await.unwrap().is_delivered());
    }
    assert_no_residue(&root);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_failure_does_not_affect_siblings() {
    let backend = ScriptedBackend::succeeding(Duration::from_millis(30)).failing_on(
        "private",
        "ERROR: [youtube] abc: Private video. Sign in if you've been granted access",
    );
    let (pipeline, temp_dir) = scripted_pipeline(backend);

    let failing = Request::video("https://example.com/private");
    let healthy: Vec<Request> = (0..6)
        .map(|i| Request::audio(format!("https://example.com/ok/{i}")))
        .collect();

    let failing_handle = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.handle(failing).await })
    };
    let healthy_handles: Vec<_> = healthy
        .into_iter()
        .map(|request| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.handle(request).await })
        })
        .collect();

    assert_eq!(
        failing_handle.await.unwrap().error_kind(),
        Some(ErrorKind::AccessDenied)
    );
    for handle in healthy_handles {
        assert!(handle.await.unwrap().is_delivered());
    }
    assert_no_residue(&temp_dir.path().join("workspaces"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn requests_run_in_parallel() {
    let delay = Duration::from_millis(300);
    let (pipeline, _temp_dir) = scripted_pipeline(ScriptedBackend::succeeding(delay));

    let start = Instant::now();
    let handles: Vec<_> = (0..10)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .handle(Request::video(format!("https://example.com/{i}")))
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_delivered());
    }

    // Ten sequential fetches would take at least 3s
    assert!(
        start.elapsed() < delay * 5,
        "requests appear to be serialized: {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn each_request_emits_its_own_lifecycle() {
    let (pipeline, _temp_dir) = scripted_pipeline(ScriptedBackend::succeeding(
        Duration::from_millis(10),
    ));
    let mut events = pipeline.subscribe();

    let request = Request::audio("https://example.com/song");
    let id = request.id;
    let outcome = pipeline.handle(request).await;
    assert!(outcome.is_delivered());

    let collected = collect_events_for(&mut events, id, Duration::from_secs(5)).await;
    assert!(matches!(
        collected.as_slice(),
        [
            Event::Received {
                kind: MediaKind::Audio,
                ..
            },
            Event::Fetching { .. },
            Event::Succeeded { .. },
            Event::Cleaned { .. },
        ]
    ));
}
