//! Traits and types for fetch backends

use crate::types::{FetchFailure, MediaKind};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// One backend invocation
#[derive(Debug, Clone, Copy)]
pub struct FetchJob<'a> {
    /// Resource URL
    pub url: &'a str,
    /// Requested output kind
    pub kind: MediaKind,
    /// Directory every written file must stay inside
    pub dest_dir: &'a Path,
    /// Stem produced files must be named with (`<stem>.<ext>`)
    pub file_stem: &'a str,
    /// Per-request copy of the cookie jar, if one is configured
    pub cookie_file: Option<&'a Path>,
}

/// Trait for the external fetch-and-transcode capability
///
/// Implementations perform exactly one network-bound fetch per call and must
/// not write outside `job.dest_dir`.
///
/// # Examples
///
/// ```no_run
/// use media_relay::fetch::{FetchBackend, FetchJob, FormatPolicy, YtDlpBackend};
/// use media_relay::MediaKind;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let backend = YtDlpBackend::from_path(FormatPolicy::default())
///     .expect("yt-dlp not found");
///
/// let job = FetchJob {
///     url: "https://example.com/clip",
///     kind: MediaKind::Video,
///     dest_dir: Path::new("/tmp/relay-job"),
///     file_stem: "clip",
///     cookie_file: None,
/// };
/// match backend.fetch(&job).await {
///     Ok(path) => println!("written to {}", path.display()),
///     Err(failure) => println!("backend failed: {}", failure.detail),
/// }
/// # }
/// ```
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Download `job.url` as `job.kind` into `job.dest_dir`
    ///
    /// # Returns
    ///
    /// The path of the produced file, or a [`FetchFailure`] carrying the raw
    /// diagnostic text (and a kind, when the backend already knows it).
    async fn fetch(&self, job: &FetchJob<'_>) -> Result<PathBuf, FetchFailure>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
