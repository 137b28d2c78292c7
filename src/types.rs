//! Core types for media-relay

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a request
///
/// Generated once per [`Request`] and used to name its workspace directory and
/// every file produced inside it, so two in-flight requests can never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Hyphenated form is filesystem-safe on every platform
        write!(f, "{}", self.0.hyphenated())
    }
}

impl std::str::FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// What the requester wants back from the URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Best combined video+audio, merged into one container
    Video,
    /// Best audio, transcoded to the configured codec
    Audio,
}

impl MediaKind {
    /// Lowercase name used in logs and commands
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single inbound fetch request
///
/// Immutable once built. Consumed by [`Pipeline::handle`](crate::Pipeline::handle).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Identifier naming this request's workspace
    pub id: RequestId,
    /// Resource URL to fetch from
    pub url: String,
    /// Requested output kind
    pub kind: MediaKind,
}

impl Request {
    /// Build a request with a freshly generated id
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: RequestId::new(),
            url: url.into(),
            kind,
        }
    }

    /// Shorthand for a [`MediaKind::Video`] request
    pub fn video(url: impl Into<String>) -> Self {
        Self::new(url, MediaKind::Video)
    }

    /// Shorthand for a [`MediaKind::Audio`] request
    pub fn audio(url: impl Into<String>) -> Self {
        Self::new(url, MediaKind::Audio)
    }
}

/// Failure category surfaced to the requester
///
/// Closed set. Assigned once by the classifier (or directly by the executor for
/// timeouts and missing backends) and never changed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Origin refused or blocked automated access
    AccessDenied,
    /// Resource does not exist at the origin
    NotFound,
    /// Network fault or timeout; a new request may succeed
    Transient,
    /// Format, codec, URL or size the service cannot handle
    Unsupported,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Short human-readable message for the end user
    ///
    /// Never includes backend diagnostics.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::AccessDenied => {
                "This media requires a login or verification the bot cannot provide."
            }
            ErrorKind::NotFound => "Nothing was found at that link.",
            ErrorKind::Transient => "The download timed out or the connection failed. Try again.",
            ErrorKind::Unsupported => "That link or format is not supported.",
            ErrorKind::Unknown => "Something went wrong while fetching that link.",
        }
    }

    /// Whether issuing a fresh request might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Transient => "transient",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A file the fetch step reports as produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedArtifact {
    /// Location inside the request's workspace
    pub path: PathBuf,
    /// Kind the artifact was produced as
    pub kind: MediaKind,
}

/// Raw failure from the fetch step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchFailure {
    /// Kind already known at the failure site (timeouts, missing backend).
    /// `None` means the classifier decides from `detail`.
    pub kind: Option<ErrorKind>,
    /// Raw diagnostic text, logged but never shown to the user
    pub detail: String,
}

impl FetchFailure {
    /// Failure to be classified from its diagnostic text
    pub fn raw(detail: impl Into<String>) -> Self {
        Self {
            kind: None,
            detail: detail.into(),
        }
    }

    /// Failure whose kind is already known
    pub fn with_kind(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            detail: detail.into(),
        }
    }
}

/// Result of one fetch attempt
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchResult {
    /// The backend produced an artifact
    Success(FetchedArtifact),
    /// The backend failed or was abandoned
    Failure(FetchFailure),
}

/// Artifact content handed back to the transport
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    /// File name the artifact had in the workspace (`<request id>.<ext>`)
    pub file_name: String,
    /// Kind of media
    pub kind: MediaKind,
    /// Artifact bytes
    pub bytes: Vec<u8>,
}

impl Payload {
    /// Number of bytes in the payload
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Terminal state of a request as seen by the transport
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Artifact read successfully
    Delivered(Payload),
    /// Request failed with a classified kind
    Rejected(ErrorKind),
}

impl DeliveryOutcome {
    /// The rejection kind, if any
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            DeliveryOutcome::Delivered(_) => None,
            DeliveryOutcome::Rejected(kind) => Some(*kind),
        }
    }

    /// Whether the request produced an artifact
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered(_))
    }
}

/// Lifecycle events emitted by the pipeline
///
/// Follows the per-request state machine:
/// `Received → Fetching → {Succeeded, Failed} → Cleaned`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Request accepted and workspace about to be allocated
    Received {
        /// Request ID
        id: RequestId,
        /// Requested kind
        kind: MediaKind,
    },
    /// Backend invoked
    Fetching {
        /// Request ID
        id: RequestId,
    },
    /// Artifact produced and read
    Succeeded {
        /// Request ID
        id: RequestId,
        /// Artifact size in bytes
        bytes: u64,
    },
    /// Request failed
    Failed {
        /// Request ID
        id: RequestId,
        /// Classified failure
        kind: ErrorKind,
    },
    /// Workspace released
    Cleaned {
        /// Request ID
        id: RequestId,
    },
}

impl Event {
    /// Request this event belongs to
    pub fn request_id(&self) -> RequestId {
        match self {
            Event::Received { id, .. }
            | Event::Fetching { id }
            | Event::Succeeded { id, .. }
            | Event::Failed { id, .. }
            | Event::Cleaned { id } => *id,
        }
    }
}
