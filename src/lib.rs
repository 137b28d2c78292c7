//! # media-relay
//!
//! Per-request media retrieval pipeline for chat bots.
//!
//! A request is a URL plus a [`MediaKind`]. The pipeline fetches it with an
//! external downloader (`yt-dlp`) into a workspace that belongs to that
//! request alone, reads the resulting file into memory and removes the
//! workspace before returning, whether the fetch succeeded or not.
//!
//! ## Design Philosophy
//!
//! - **Isolation** - every request gets its own directory named after its id
//! - **No residue** - the workspace is released on success, failure, timeout,
//!   cancellation and panic alike
//! - **Classified failures** - raw downloader diagnostics are mapped to a small
//!   [`ErrorKind`] set with fixed user-facing messages
//! - **Transport-agnostic** - chat services plug in through [`DeliveryAdapter`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_relay::{Config, Pipeline, Request};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::from_config(Config::default())?;
//!
//!     // Subscribe to lifecycle events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let outcome = pipeline.handle(Request::video("https://example.com/watch?v=1")).await;
//!     println!("{outcome:?}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Failure classification rules
pub mod classify;
/// Chat command parsing helper
pub mod command;
/// Configuration types
pub mod config;
/// Delivery adapter seam
pub mod delivery;
/// Error types
pub mod error;
/// Media fetching backends and executor
pub mod fetch;
/// Request orchestration
pub mod pipeline;
/// Core types
pub mod types;
/// Per-request workspaces
pub mod workspace;

pub use classify::Classifier;
pub use config::{
    ClassifierConfig, ClassifierRule, Config, DeliveryConfig, FetchConfig, WorkspaceConfig,
};
pub use delivery::DeliveryAdapter;
pub use error::{Error, Result};
pub use pipeline::Pipeline;
pub use types::{
    DeliveryOutcome, ErrorKind, Event, FetchFailure, FetchResult, FetchedArtifact, MediaKind,
    Payload, Request, RequestId,
};
pub use workspace::{Workspace, WorkspaceManager};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives a termination signal.
///
/// Pass the same token to [`Pipeline::handle_with_cancellation`] so in-flight
/// requests stop their fetch and release their workspaces on shutdown.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Returns early, without cancelling, if `token` is cancelled elsewhere first.
///
/// # Example
///
/// ```no_run
/// use media_relay::{Config, Pipeline, Request, cancel_on_shutdown};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = Pipeline::from_config(Config::default())?;
///     let shutdown = CancellationToken::new();
///     tokio::spawn(cancel_on_shutdown(shutdown.clone()));
///
///     let outcome = pipeline
///         .handle_with_cancellation(Request::audio("https://example.com/a"), &shutdown)
///         .await;
///     println!("{outcome:?}");
///     Ok(())
/// }
/// ```
pub async fn cancel_on_shutdown(token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = wait_for_signal() => {
            tracing::info!("shutting down, cancelling in-flight requests");
            token.cancel();
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(_), Err(e)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_on_shutdown_returns_when_token_is_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let watcher = tokio::spawn(cancel_on_shutdown(token.clone()));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), watcher)
            .await
            .expect("watcher should stop once the token is cancelled")
            .unwrap();
    }
}
