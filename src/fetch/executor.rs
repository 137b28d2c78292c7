//! Fetch executor: timeout, confinement and fault capture around a backend

use super::traits::{FetchBackend, FetchJob};
use crate::types::{ErrorKind, FetchFailure, FetchResult, FetchedArtifact, MediaKind};
use crate::workspace::Workspace;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Drives one backend call per request and always yields a [`FetchResult`]
///
/// Nothing escapes this boundary: backend failures, timeouts, panics and
/// artifacts reported outside the workspace all become
/// [`FetchResult::Failure`].
#[derive(Clone)]
pub struct FetchExecutor {
    backend: Arc<dyn FetchBackend>,
    timeout: Duration,
    cookie_file: Option<PathBuf>,
}

impl FetchExecutor {
    /// Create an executor bounding each fetch by `timeout`
    pub fn new(backend: Arc<dyn FetchBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            cookie_file: None,
        }
    }

    /// Cookie jar copied into each workspace before the fetch
    pub fn with_cookie_file(mut self, cookie_file: Option<PathBuf>) -> Self {
        self.cookie_file = cookie_file;
        self
    }

    /// Name of the wrapped backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `url` as `kind` into `workspace`
    pub async fn fetch(&self, url: &str, kind: MediaKind, workspace: &Workspace) -> FetchResult {
        let request_id = workspace.id();

        let cookie_copy = match self.copy_cookie_file(workspace).await {
            Ok(copy) => copy,
            Err(failure) => return FetchResult::Failure(failure),
        };

        let file_stem = workspace.file_stem();
        let job = FetchJob {
            url,
            kind,
            dest_dir: workspace.path(),
            file_stem: &file_stem,
            cookie_file: cookie_copy.as_deref(),
        };

        debug!(
            request_id = %request_id,
            backend = self.backend.name(),
            %kind,
            timeout_secs = self.timeout.as_secs(),
            "starting fetch"
        );

        let call = AssertUnwindSafe(self.backend.fetch(&job)).catch_unwind();
        let reported = match tokio::time::timeout(self.timeout, call).await {
            Err(_) => {
                warn!(request_id = %request_id, timeout_secs = self.timeout.as_secs(), "fetch timed out");
                return FetchResult::Failure(FetchFailure::with_kind(
                    ErrorKind::Transient,
                    format!("fetch timed out after {}s", self.timeout.as_secs()),
                ));
            }
            Ok(Err(panic)) => {
                let detail = panic_message(panic.as_ref());
                warn!(request_id = %request_id, %detail, "fetch backend panicked");
                return FetchResult::Failure(FetchFailure::with_kind(
                    ErrorKind::Unknown,
                    format!("fetch backend panicked: {detail}"),
                ));
            }
            Ok(Ok(Err(failure))) => return FetchResult::Failure(failure),
            Ok(Ok(Ok(path))) => path,
        };

        let path = if reported.is_absolute() {
            reported
        } else {
            workspace.path().join(reported)
        };

        if !workspace.contains(&path).await {
            warn!(request_id = %request_id, ?path, "backend reported a file outside the workspace");
            return FetchResult::Failure(FetchFailure::with_kind(
                ErrorKind::Unknown,
                format!("artifact {} is not inside the workspace", path.display()),
            ));
        }
        if cookie_copy.as_deref() == Some(path.as_path()) {
            return FetchResult::Failure(FetchFailure::with_kind(
                ErrorKind::Unknown,
                "backend reported the cookie jar as its artifact",
            ));
        }

        debug!(request_id = %request_id, ?path, "fetch produced artifact");
        FetchResult::Success(FetchedArtifact { path, kind })
    }

    /// Copy the shared cookie jar into the workspace
    ///
    /// The backend may rewrite its cookie jar, and the shared original must
    /// never be written by a request.
    async fn copy_cookie_file(
        &self,
        workspace: &Workspace,
    ) -> Result<Option<PathBuf>, FetchFailure> {
        let Some(source) = &self.cookie_file else {
            return Ok(None);
        };
        let copy = workspace.file_path("cookies.txt");
        tokio::fs::copy(source, &copy).await.map_err(|e| {
            warn!(request_id = %workspace.id(), ?source, error = %e, "failed to copy cookie file");
            FetchFailure::with_kind(
                ErrorKind::Unknown,
                format!("failed to copy cookie file {}: {}", source.display(), e),
            )
        })?;
        Ok(Some(copy))
    }
}

impl std::fmt::Debug for FetchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchExecutor")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .field("cookie_file", &self.cookie_file)
            .finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
