//! Backend fixtures for integration tests

use async_trait::async_trait;
use media_relay::fetch::{FetchBackend, FetchJob};
use media_relay::{FetchFailure, MediaKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// Rendezvous between a test and a fixed number of in-flight fetches
///
/// Each fetch waits on `arrived` once it is running (its workspace exists),
/// then on `release` before doing any work. The test joins both barriers.
#[derive(Debug, Clone)]
pub struct FetchGate {
    /// Passed once every fetch and the test have arrived
    pub arrived: Arc<Barrier>,
    /// Passed once the test lets the fetches continue
    pub release: Arc<Barrier>,
}

impl FetchGate {
    /// Gate for `fetches` concurrent fetches plus the test itself
    pub fn new(fetches: usize) -> Self {
        Self {
            arrived: Arc::new(Barrier::new(fetches + 1)),
            release: Arc::new(Barrier::new(fetches + 1)),
        }
    }
}

/// Backend that writes the request URL into `<stem>.<ext>` after a delay
///
/// Because the content is the URL, a test can tell whose artifact it got.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    /// Delay before writing the artifact
    pub delay: Duration,
    /// URLs containing this substring fail with the given raw detail
    pub fail_on: Option<(String, String)>,
    /// Optional rendezvous held before any work
    pub gate: Option<FetchGate>,
}

impl ScriptedBackend {
    /// Backend that always succeeds after `delay`
    pub fn succeeding(delay: Duration) -> Self {
        Self {
            delay,
            fail_on: None,
            gate: None,
        }
    }

    /// Hold every fetch at `gate` before it starts working
    pub fn gated(mut self, gate: FetchGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Fail URLs containing `needle` with `detail` as the raw diagnostic
    pub fn failing_on(mut self, needle: &str, detail: &str) -> Self {
        self.fail_on = Some((needle.to_string(), detail.to_string()));
        self
    }
}

#[async_trait]
impl FetchBackend for ScriptedBackend {
    async fn fetch(&self, job: &FetchJob<'_>) -> Result<PathBuf, FetchFailure> {
        if let Some(gate) = &self.gate {
            gate.arrived.wait().await;
            gate.release.wait().await;
        }
        tokio::time::sleep(self.delay).await;

        // Leave a partial file behind, the way an interrupted download would
        let partial = job.dest_dir.join(format!("{}.part", job.file_stem));
        tokio::fs::write(&partial, b"partial")
            .await
            .map_err(|e| FetchFailure::raw(e.to_string()))?;

        if let Some((needle, detail)) = &self.fail_on
            && job.url.contains(needle.as_str())
        {
            return Err(FetchFailure::raw(detail.clone()));
        }

        let ext = match job.kind {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        };
        let path = job.dest_dir.join(format!("{}.{ext}", job.file_stem));
        tokio::fs::write(&path, job.url.as_bytes())
            .await
            .map_err(|e| FetchFailure::raw(e.to_string()))?;
        Ok(path)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
