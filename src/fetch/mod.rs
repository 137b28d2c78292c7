//! Media fetching
//!
//! The fetch step turns `(url, kind)` into one file inside the request's
//! workspace. It is split along the same seam as the rest of the crate:
//!
//! - [`FetchBackend`]: the external capability that downloads and transcodes.
//!   [`YtDlpBackend`] drives the `yt-dlp` binary; [`UnavailableBackend`] is the
//!   stand-in when no binary is installed.
//! - [`FormatPolicy`]: which representation to request for each
//!   [`MediaKind`](crate::MediaKind), and how to post-process it.
//! - [`FetchExecutor`]: wraps a backend with the timeout, the cookie-file copy
//!   and the workspace confinement check, and turns every outcome (including
//!   panics) into a [`FetchResult`](crate::FetchResult).
//!
//! ## Usage
//!
//! ```no_run
//! use media_relay::fetch::{FetchExecutor, FormatPolicy, YtDlpBackend};
//! use media_relay::workspace::WorkspaceManager;
//! use media_relay::{FetchResult, MediaKind, RequestId};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = YtDlpBackend::from_path(FormatPolicy::default())
//!     .expect("yt-dlp not found in PATH");
//! let executor = FetchExecutor::new(Arc::new(backend), Duration::from_secs(300));
//!
//! let manager = WorkspaceManager::new(std::env::temp_dir().join("media-relay"));
//! let workspace = manager.acquire(RequestId::new()).await?;
//! match executor.fetch("https://example.com/clip", MediaKind::Audio, &workspace).await {
//!     FetchResult::Success(artifact) => println!("fetched {:?}", artifact.path),
//!     FetchResult::Failure(failure) => println!("failed: {}", failure.detail),
//! }
//! manager.release(workspace).await;
//! # Ok(())
//! # }
//! ```

mod cli;
mod executor;
mod noop;
mod parser;
mod policy;
mod process;
mod traits;

pub use cli::YtDlpBackend;
pub use executor::FetchExecutor;
pub(crate) use executor::panic_message;
pub use noop::UnavailableBackend;
pub use parser::{failure_detail, parse_output_path};
pub use policy::FormatPolicy;
pub use traits::{FetchBackend, FetchJob};
