//! Format and post-processing policy per media kind

use crate::config::FetchConfig;
use crate::types::MediaKind;

/// Format selector for video: best separate streams, falling back to best combined
pub const VIDEO_FORMAT: &str = "bestvideo+bestaudio/best";
/// Format selector for audio
pub const AUDIO_FORMAT: &str = "bestaudio/best";

/// Which representation to request and how to post-process it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatPolicy {
    /// Container separate video/audio streams are merged into
    pub video_container: String,
    /// Codec audio is transcoded to
    pub audio_codec: String,
    /// Target audio bitrate in kbps
    pub audio_quality_kbps: u32,
}

impl FormatPolicy {
    /// Policy from the fetch configuration
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            video_container: config.preferred_video_container.clone(),
            audio_codec: config.audio_codec.clone(),
            audio_quality_kbps: config.audio_quality_kbps,
        }
    }

    /// yt-dlp arguments selecting the format and post-processing for `kind`
    pub fn backend_args(&self, kind: MediaKind) -> Vec<String> {
        match kind {
            MediaKind::Video => vec![
                "--format".into(),
                VIDEO_FORMAT.into(),
                "--merge-output-format".into(),
                self.video_container.clone(),
            ],
            MediaKind::Audio => vec![
                "--format".into(),
                AUDIO_FORMAT.into(),
                "--extract-audio".into(),
                "--audio-format".into(),
                self.audio_codec.clone(),
                "--audio-quality".into(),
                format!("{}K", self.audio_quality_kbps),
            ],
        }
    }

    /// File extension the artifact is expected to carry
    ///
    /// Only a preference: the backend may keep the source container when no
    /// merge is needed, so the reported path always wins.
    pub fn expected_extension(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Video => &self.video_container,
            MediaKind::Audio => match self.audio_codec.as_str() {
                "aac" | "alac" => "m4a",
                "vorbis" => "ogg",
                other => other,
            },
        }
    }
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}
