//! Configuration types for media-relay
//!
//! Built once at process start and shared read-only (`Arc<Config>`) by every
//! request. Every field has a default, so an empty JSON object is a valid config.

use crate::error::{Error, Result};
use crate::types::{ErrorKind, MediaKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fetch backend settings (binary location, format policy, timeout)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if `binary_path` is not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Container video streams are merged into (default: "mp4")
    #[serde(default = "default_video_container")]
    pub preferred_video_container: String,

    /// Codec audio requests are transcoded to (default: "mp3")
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Target audio bitrate in kbps (default: 192)
    #[serde(default = "default_audio_quality")]
    pub audio_quality_kbps: u32,

    /// Upper bound on one fetch, serialized as whole seconds (default: 300)
    #[serde(
        rename = "fetch_timeout_secs",
        default = "default_fetch_timeout",
        with = "duration_serde"
    )]
    pub fetch_timeout: Duration,

    /// Netscape-format cookie file handed to the backend (copied per request)
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,

    /// Additional arguments appended to every backend invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            search_path: true,
            preferred_video_container: default_video_container(),
            audio_codec: default_audio_codec(),
            audio_quality_kbps: default_audio_quality(),
            fetch_timeout: default_fetch_timeout(),
            cookie_file: None,
            extra_args: Vec::new(),
        }
    }
}

/// Where per-request workspaces are created
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Parent directory for workspaces (default: `<system temp>/media-relay`)
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

/// Delivery limits and captions
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Largest artifact the transport can upload (default: 50 MiB, None = unlimited)
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: Option<u64>,

    /// Caption sent with video artifacts
    #[serde(default = "default_video_caption")]
    pub video_caption: String,

    /// Caption sent with audio artifacts
    #[serde(default = "default_audio_caption")]
    pub audio_caption: String,
}

impl DeliveryConfig {
    /// Caption for the given kind
    pub fn caption(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Video => &self.video_caption,
            MediaKind::Audio => &self.audio_caption,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_artifact_bytes: default_max_artifact_bytes(),
            video_caption: default_video_caption(),
            audio_caption: default_audio_caption(),
        }
    }
}

/// One extra classification rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRule {
    /// Case-insensitive regular expression matched against the raw failure text
    pub pattern: String,
    /// Kind assigned on match
    pub kind: ErrorKind,
}

/// Failure classification settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Rules checked before the built-in table, in order
    #[serde(default)]
    pub extra_rules: Vec<ClassifierRule>,
}

/// Main configuration for the pipeline
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fetch backend and format policy
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Workspace location
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Delivery limits and captions
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Extra failure classification rules
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl Config {
    /// Parse a JSON config and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_json_str(&raw)
    }

    /// Check values that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.fetch.fetch_timeout.is_zero() {
            return Err(Error::config(
                "fetch.fetch_timeout_secs",
                "fetch timeout must be greater than zero",
            ));
        }
        if self.fetch.preferred_video_container.trim().is_empty() {
            return Err(Error::config(
                "fetch.preferred_video_container",
                "video container must not be empty",
            ));
        }
        if self.fetch.audio_codec.trim().is_empty() {
            return Err(Error::config(
                "fetch.audio_codec",
                "audio codec must not be empty",
            ));
        }
        if self.fetch.audio_quality_kbps == 0 {
            return Err(Error::config(
                "fetch.audio_quality_kbps",
                "audio quality must be greater than zero",
            ));
        }
        if self.workspace.root.as_os_str().is_empty() {
            return Err(Error::config(
                "workspace.root",
                "workspace root must not be empty",
            ));
        }
        for (index, rule) in self.classifier.extra_rules.iter().enumerate() {
            if let Err(e) = regex::Regex::new(&rule.pattern) {
                return Err(Error::config(
                    format!("classifier.extra_rules[{index}].pattern"),
                    format!("invalid pattern {:?}: {}", rule.pattern, e),
                ));
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_video_container() -> String {
    "mp4".to_string()
}

fn default_audio_codec() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> u32 {
    192
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("media-relay")
}

fn default_max_artifact_bytes() -> Option<u64> {
    Some(50 * 1024 * 1024)
}

fn default_video_caption() -> String {
    "Video downloaded!".to_string()
}

fn default_audio_caption() -> String {
    "Audio downloaded!".to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
