//! Stand-in backend for when no fetch tool is installed

use super::traits::{FetchBackend, FetchJob};
use crate::types::{ErrorKind, FetchFailure};
use async_trait::async_trait;
use std::path::PathBuf;

/// Backend used when no `yt-dlp` binary is available or configured
///
/// Every fetch fails with [`ErrorKind::Unsupported`], so the pipeline keeps
/// answering requests with a clear rejection instead of refusing to start.
///
/// # Examples
///
/// ```
/// use media_relay::fetch::{FetchBackend, FetchJob, UnavailableBackend};
/// use media_relay::{ErrorKind, MediaKind};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let job = FetchJob {
///     url: "https://example.com/clip",
///     kind: MediaKind::Audio,
///     dest_dir: Path::new("/tmp"),
///     file_stem: "clip",
///     cookie_file: None,
/// };
/// let failure = UnavailableBackend.fetch(&job).await.unwrap_err();
/// assert_eq!(failure.kind, Some(ErrorKind::Unsupported));
/// # }
/// ```
pub struct UnavailableBackend;

#[async_trait]
impl FetchBackend for UnavailableBackend {
    async fn fetch(&self, _job: &FetchJob<'_>) -> Result<PathBuf, FetchFailure> {
        Err(FetchFailure::with_kind(
            ErrorKind::Unsupported,
            "fetching requires the external yt-dlp binary. \
             Configure fetch.binary_path or ensure yt-dlp is in PATH.",
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
