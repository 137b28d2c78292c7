//! CLI-based fetch backend using the external yt-dlp binary

use super::parser::{failure_detail, parse_output_path};
use super::policy::FormatPolicy;
use super::process::{ProcessGroupGuard, group_command};
use super::traits::{FetchBackend, FetchJob};
use crate::config::FetchConfig;
use crate::types::{ErrorKind, FetchFailure};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::debug;

/// Fetch backend that runs `yt-dlp`
///
/// Every path the binary may write to (final file, fragments, cache, cookie
/// jar) is pointed at the job's destination directory, config files are
/// ignored, and the binary runs in its own process group which is killed when
/// the fetch ends or its future is dropped, so an abandoned fetch leaves
/// nothing running (ffmpeg included).
///
/// # Examples
///
/// ```no_run
/// use media_relay::fetch::{FormatPolicy, YtDlpBackend};
/// use std::path::PathBuf;
///
/// // Explicit path
/// let backend = YtDlpBackend::new(PathBuf::from("/usr/local/bin/yt-dlp"), FormatPolicy::default());
///
/// // Or auto-discover from PATH
/// let backend = YtDlpBackend::from_path(FormatPolicy::default())
///     .expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    binary_path: PathBuf,
    policy: FormatPolicy,
    extra_args: Vec<String>,
}

impl YtDlpBackend {
    /// Create a backend with an explicit binary path
    pub fn new(binary_path: PathBuf, policy: FormatPolicy) -> Self {
        Self {
            binary_path,
            policy,
            extra_args: Vec::new(),
        }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Uses the `which` crate to search for the `yt-dlp` binary.
    pub fn from_path(policy: FormatPolicy) -> Option<Self> {
        which::which("yt-dlp")
            .ok()
            .map(|path| Self::new(path, policy))
    }

    /// Build from configuration: explicit path first, then PATH if allowed
    pub fn from_config(config: &FetchConfig) -> Option<Self> {
        let policy = FormatPolicy::from_config(config);
        let backend = match &config.binary_path {
            Some(path) => Some(Self::new(path.clone(), policy)),
            None if config.search_path => Self::from_path(policy),
            None => None,
        };
        backend.map(|b| b.with_extra_args(config.extra_args.clone()))
    }

    /// Arguments appended after the policy arguments
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Path of the binary this backend runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Full argument list for one job
    pub fn build_args(&self, job: &FetchJob<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            // Config files may add output paths outside dest_dir
            "--ignore-config".into(),
            "--no-playlist".into(),
            "--no-progress".into(),
            "--no-cache-dir".into(),
            "--no-mtime".into(),
            "--paths".into(),
            job.dest_dir.as_os_str().to_owned(),
            "--paths".into(),
            prefixed("temp:", job.dest_dir),
            "--output".into(),
            format!("{}.%(ext)s", job.file_stem).into(),
            "--print".into(),
            "after_move:filepath".into(),
            "--no-simulate".into(),
        ];

        if let Some(cookies) = job.cookie_file {
            args.push("--cookies".into());
            args.push(cookies.as_os_str().to_owned());
        }

        args.extend(self.policy.backend_args(job.kind).into_iter().map(OsString::from));
        args.extend(self.extra_args.iter().map(OsString::from));

        // "--" keeps a URL starting with '-' from being read as an option
        args.push("--".into());
        args.push(job.url.into());
        args
    }
}

#[async_trait]
impl FetchBackend for YtDlpBackend {
    async fn fetch(&self, job: &FetchJob<'_>) -> Result<PathBuf, FetchFailure> {
        let args = self.build_args(job);
        debug!(binary = ?self.binary_path, ?args, "running yt-dlp");

        let child = group_command(&self.binary_path)
            .args(&args)
            .current_dir(job.dest_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                FetchFailure::with_kind(
                    ErrorKind::Unsupported,
                    format!("Failed to execute yt-dlp: {}", e),
                )
            })?;

        // Kills yt-dlp's children too, on every exit path including a dropped future
        let _group = ProcessGroupGuard::new(child.id());
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| FetchFailure::raw(format!("failed to wait for yt-dlp: {e}")))?;

        if !output.status.success() {
            return Err(FetchFailure::raw(failure_detail(
                &output.stdout,
                &output.stderr,
                output.status.code(),
            )));
        }

        if let Some(path) = parse_output_path(&output.stdout) {
            return Ok(path);
        }

        // Older builds ignore `after_move`; fall back to looking for the file
        let preferred = self.policy.expected_extension(job.kind);
        locate_artifact(job.dest_dir, job.file_stem, preferred)
            .await
            .ok_or_else(|| {
                FetchFailure::with_kind(
                    ErrorKind::Unknown,
                    "yt-dlp reported success but produced no file",
                )
            })
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

fn prefixed(prefix: &str, path: &Path) -> OsString {
    let mut value = OsString::from(prefix);
    value.push(path.as_os_str());
    value
}

/// Find `<stem>.<ext>` in `dir`, preferring `preferred_ext`
///
/// Skips partial downloads and the cookie jar copy.
async fn locate_artifact(dir: &Path, stem: &str, preferred_ext: &str) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut candidates = Vec::new();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(ext) = name.strip_prefix(stem).and_then(|rest| rest.strip_prefix('.')) else {
            continue;
        };
        if ext.is_empty()
            || ext.contains('.')
            || matches!(ext, "part" | "ytdl" | "temp" | "cookies")
        {
            continue;
        }
        candidates.push((ext.eq_ignore_ascii_case(preferred_ext), path));
    }

    // preferred extension first, then by name for a stable choice
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    candidates.into_iter().next().map(|(_, path)| path)
}
