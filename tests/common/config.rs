//! Test configuration helpers

use media_relay::config::{FetchConfig, WorkspaceConfig};
use media_relay::{Config, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::fixtures::ScriptedBackend;

/// Config rooted in `temp_dir` that never looks for yt-dlp on PATH
pub fn isolated_config(temp_dir: &TempDir) -> Config {
    Config {
        fetch: FetchConfig {
            search_path: false,
            fetch_timeout: Duration::from_secs(10),
            ..Default::default()
        },
        workspace: WorkspaceConfig {
            root: temp_dir.path().join("workspaces"),
        },
        ..Default::default()
    }
}

/// Create a pipeline around a [`ScriptedBackend`]
///
/// Returns the pipeline and temp directory (keep temp_dir alive for test duration)
pub fn scripted_pipeline(backend: ScriptedBackend) -> (Pipeline, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = isolated_config(&temp_dir);
    let pipeline =
        Pipeline::new(Arc::new(config), Arc::new(backend)).expect("Failed to create pipeline");
    (pipeline, temp_dir)
}

/// Settings for tests that run the real yt-dlp binary
#[derive(Debug, Clone)]
pub struct LiveSettings {
    /// Public URL expected to download
    pub url: String,
    /// Explicit yt-dlp binary; PATH is searched when unset
    pub binary_path: Option<PathBuf>,
}

/// Load live-test settings from `.env` / the environment
///
/// Required environment variables:
/// - `MEDIA_RELAY_LIVE_URL` - a short, public video URL
///
/// Optional environment variables:
/// - `MEDIA_RELAY_YTDLP` - path to the yt-dlp binary
pub fn load_live_settings() -> Option<LiveSettings> {
    dotenvy::dotenv().ok();

    let url = std::env::var("MEDIA_RELAY_LIVE_URL").ok()?;
    let binary_path = std::env::var("MEDIA_RELAY_YTDLP").ok().map(PathBuf::from);
    Some(LiveSettings { url, binary_path })
}

/// Whether live settings are present
pub fn has_live_settings() -> bool {
    load_live_settings().is_some()
}

/// Skip test if live settings are not available
#[macro_export]
macro_rules! skip_if_no_live_settings {
    () => {
        if !$crate::common::has_live_settings() {
            eprintln!("Skipping test: MEDIA_RELAY_LIVE_URL not found in .env");
            return;
        }
    };
}
