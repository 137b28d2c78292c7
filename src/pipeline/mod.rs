//! Request orchestration
//!
//! One call to [`Pipeline::handle`] takes one request through
//! `Received → Fetching → {Succeeded, Failed} → Cleaned`:
//!
//! 1. Validate the URL (no workspace is allocated for a bad one)
//! 2. Acquire a workspace named after the request id
//! 3. Run the fetch executor
//! 4. Read the artifact, or classify the failure
//! 5. Release the workspace, whatever happened in 3–4
//!
//! Requests share nothing mutable: each has its own workspace, and the
//! configuration, backend and classifier are read-only.

use crate::classify::Classifier;
use crate::config::Config;
use crate::delivery::DeliveryAdapter;
use crate::error::{Error, Result};
use crate::fetch::{FetchBackend, FetchExecutor, UnavailableBackend, YtDlpBackend};
use crate::types::{
    DeliveryOutcome, ErrorKind, Event, FetchResult, FetchedArtifact, Payload, Request, RequestId,
};
use crate::workspace::{Workspace, WorkspaceManager};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Capacity of the lifecycle event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Per-request media retrieval and delivery pipeline
///
/// Cheap to clone; clones share the event channel and read-only state.
///
/// # Examples
///
/// ```no_run
/// use media_relay::{Config, DeliveryOutcome, Pipeline, Request};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = Pipeline::from_config(Config::default())?;
///
/// match pipeline.handle(Request::audio("https://example.com/watch?v=1")).await {
///     DeliveryOutcome::Delivered(payload) => println!("got {} bytes", payload.len()),
///     DeliveryOutcome::Rejected(kind) => println!("{}", kind.user_message()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    workspaces: WorkspaceManager,
    executor: FetchExecutor,
    classifier: Classifier,
    event_tx: broadcast::Sender<Event>,
}

impl Pipeline {
    /// Create a pipeline around an explicit backend
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration does not validate.
    pub fn new(config: Arc<Config>, backend: Arc<dyn FetchBackend>) -> Result<Self> {
        config.validate()?;

        let classifier = Classifier::from_config(&config.classifier)?;
        let workspaces = WorkspaceManager::from_config(&config.workspace);
        let executor = FetchExecutor::new(backend, config.fetch.fetch_timeout)
            .with_cookie_file(config.fetch.cookie_file.clone());
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!(
            backend = executor.backend_name(),
            workspace_root = ?workspaces.root(),
            timeout_secs = config.fetch.fetch_timeout.as_secs(),
            "pipeline ready"
        );

        Ok(Self {
            config,
            workspaces,
            executor,
            classifier,
            event_tx,
        })
    }

    /// Create a pipeline using yt-dlp as configured
    ///
    /// Falls back to [`UnavailableBackend`] when no binary is found, so every
    /// request is rejected as unsupported instead of failing at startup.
    pub fn from_config(config: Config) -> Result<Self> {
        let backend: Arc<dyn FetchBackend> = match YtDlpBackend::from_config(&config.fetch) {
            Some(backend) => {
                debug!(binary = ?backend.binary_path(), "using yt-dlp backend");
                Arc::new(backend)
            }
            None => {
                warn!("yt-dlp not found, every request will be rejected as unsupported");
                Arc::new(UnavailableBackend)
            }
        };
        Self::new(Arc::new(config), backend)
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Shared configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory workspaces are created under
    pub fn workspace_root(&self) -> &Path {
        self.workspaces.root()
    }

    /// Turn one request into an artifact or a classified rejection
    ///
    /// Never fails: every fault ends as [`DeliveryOutcome::Rejected`]. The
    /// request's workspace no longer exists when this returns.
    pub async fn handle(&self, request: Request) -> DeliveryOutcome {
        let never = CancellationToken::new();
        self.run(request, &never).await
    }

    /// Like [`handle`](Self::handle), abandoning the fetch when `cancel` fires
    ///
    /// A cancelled request is reported as [`ErrorKind::Transient`] after its
    /// workspace has been released.
    pub async fn handle_with_cancellation(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> DeliveryOutcome {
        self.run(request, cancel).await
    }

    /// Handle a request and push the result through `adapter`
    ///
    /// Calls [`DeliveryAdapter::deliver`] once on success or
    /// [`DeliveryAdapter::report_failure`] once on rejection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Delivery`] if the adapter fails. Delivery is not retried.
    pub async fn serve(
        &self,
        request: Request,
        adapter: &dyn DeliveryAdapter,
    ) -> Result<DeliveryOutcome> {
        let id = request.id;
        let outcome = self.handle(request).await;

        let sent = match &outcome {
            DeliveryOutcome::Delivered(payload) => {
                adapter
                    .deliver(payload, self.config.delivery.caption(payload.kind))
                    .await
            }
            DeliveryOutcome::Rejected(kind) => {
                adapter.report_failure(*kind, kind.user_message()).await
            }
        };

        match sent {
            Ok(()) => Ok(outcome),
            Err(e) => {
                warn!(request_id = %id, error = %e, "delivery adapter failed");
                Err(match e {
                    Error::Delivery(message) => Error::Delivery(message),
                    other => Error::Delivery(other.to_string()),
                })
            }
        }
    }

    async fn run(&self, request: Request, cancel: &CancellationToken) -> DeliveryOutcome {
        let id = request.id;
        info!(request_id = %id, kind = %request.kind, url = %request.url, "request received");
        self.emit(Event::Received {
            id,
            kind: request.kind,
        });

        if let Err(reason) = validate_url(&request.url) {
            info!(request_id = %id, %reason, "request rejected before fetching");
            return self.finish(id, DeliveryOutcome::Rejected(ErrorKind::Unsupported));
        }

        let workspace = match self.workspaces.acquire(id).await {
            Ok(workspace) => workspace,
            Err(e) => {
                warn!(request_id = %id, error = %e, "failed to acquire workspace");
                return self.finish(id, DeliveryOutcome::Rejected(ErrorKind::Unknown));
            }
        };

        let work = AssertUnwindSafe(self.process(&request, &workspace)).catch_unwind();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(request_id = %id, "request cancelled");
                DeliveryOutcome::Rejected(ErrorKind::Transient)
            }
            result = work => match result {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let detail = crate::fetch::panic_message(panic.as_ref());
                    error!(request_id = %id, %detail, "request processing panicked");
                    DeliveryOutcome::Rejected(ErrorKind::Unknown)
                }
            },
        };

        let outcome = self.finish(id, outcome);
        self.workspaces.release(workspace).await;
        self.emit(Event::Cleaned { id });
        outcome
    }

    /// Fetch and read; runs inside the workspace scope
    async fn process(&self, request: &Request, workspace: &Workspace) -> DeliveryOutcome {
        self.emit(Event::Fetching { id: request.id });

        match self
            .executor
            .fetch(request.url.trim(), request.kind, workspace)
            .await
        {
            FetchResult::Success(artifact) => self.read_artifact(request.id, &artifact).await,
            FetchResult::Failure(failure) => {
                let kind = failure
                    .kind
                    .unwrap_or_else(|| self.classifier.classify(&failure.detail));
                warn!(
                    request_id = %request.id,
                    %kind,
                    detail = %failure.detail,
                    "fetch failed"
                );
                DeliveryOutcome::Rejected(kind)
            }
        }
    }

    /// Read a produced artifact into memory
    ///
    /// Missing or empty artifacts are `Unknown`; artifacts larger than the
    /// configured ceiling are `Unsupported`.
    async fn read_artifact(&self, id: RequestId, artifact: &FetchedArtifact) -> DeliveryOutcome {
        let size = match tokio::fs::metadata(&artifact.path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                warn!(request_id = %id, path = ?artifact.path, "artifact is not a regular file");
                return DeliveryOutcome::Rejected(ErrorKind::Unknown);
            }
            Err(e) => {
                warn!(request_id = %id, path = ?artifact.path, error = %e, "artifact missing after reported success");
                return DeliveryOutcome::Rejected(ErrorKind::Unknown);
            }
        };

        if size == 0 {
            warn!(request_id = %id, path = ?artifact.path, "artifact is empty");
            return DeliveryOutcome::Rejected(ErrorKind::Unknown);
        }
        if let Some(limit) = self.config.delivery.max_artifact_bytes
            && size > limit
        {
            info!(request_id = %id, size, limit, "artifact exceeds delivery size limit");
            return DeliveryOutcome::Rejected(ErrorKind::Unsupported);
        }

        let bytes = match tokio::fs::read(&artifact.path).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                warn!(request_id = %id, path = ?artifact.path, "artifact is empty");
                return DeliveryOutcome::Rejected(ErrorKind::Unknown);
            }
            Err(e) => {
                warn!(request_id = %id, path = ?artifact.path, error = %e, "failed to read artifact");
                return DeliveryOutcome::Rejected(ErrorKind::Unknown);
            }
        };

        let file_name = artifact
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.{}", id, artifact.kind));

        DeliveryOutcome::Delivered(Payload {
            file_name,
            kind: artifact.kind,
            bytes,
        })
    }

    /// Emit the terminal event and log the outcome
    fn finish(&self, id: RequestId, outcome: DeliveryOutcome) -> DeliveryOutcome {
        match &outcome {
            DeliveryOutcome::Delivered(payload) => {
                info!(request_id = %id, bytes = payload.len(), file = %payload.file_name, "request succeeded");
                self.emit(Event::Succeeded {
                    id,
                    bytes: payload.len() as u64,
                });
            }
            DeliveryOutcome::Rejected(kind) => {
                info!(request_id = %id, %kind, "request rejected");
                self.emit(Event::Failed { id, kind: *kind });
            }
        }
        outcome
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("workspace_root", &self.workspaces.root())
            .field("executor", &self.executor)
            .field("classifier_rules", &self.classifier.len())
            .finish()
    }
}

/// Accept only absolute http(s) URLs
fn validate_url(raw: &str) -> std::result::Result<(), String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty url".to_string());
    }
    let parsed = Url::parse(trimmed).map_err(|e| format!("unparseable url: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme {other:?}")),
    }
}
