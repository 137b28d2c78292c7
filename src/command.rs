//! Chat command parsing helper for transports
//!
//! Understands `/start`, `/video <url>` and `/audio <url>`, with or without a
//! `@botname` suffix on the command. The pipeline never calls this; it exists
//! so a transport can turn message text into a [`Request`].

use crate::types::{MediaKind, Request};
use thiserror::Error;

/// Welcome text for `/start`
pub const HELP_TEXT: &str = "Welcome! Send /video <URL> to download a video\n\
                             Send /audio <URL> to download audio";

/// Reply text sent while a request is being fetched
pub fn progress_text(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video => "Downloading video...",
        MediaKind::Audio => "Downloading audio...",
    }
}

/// A parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/video <url>` or `/audio <url>`
    Fetch(Request),
}

/// Why a message is not a usable command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// `/video` or `/audio` without an argument
    #[error("Please provide a URL.")]
    MissingUrl(MediaKind),
    /// Not one of the supported commands
    #[error("unknown command: {0}")]
    Unknown(String),
}

impl Command {
    /// Parse one message
    ///
    /// Only the first argument is used as the URL; anything after it is ignored.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let mut parts = text.split_whitespace();
        let head = parts.next().unwrap_or_default();

        let name = head
            .strip_prefix('/')
            .ok_or_else(|| CommandError::Unknown(head.to_string()))?;
        // "/video@my_bot" addresses a specific bot in group chats
        let name = name.split('@').next().unwrap_or_default();

        let kind = match name.to_ascii_lowercase().as_str() {
            "start" | "help" => return Ok(Command::Start),
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            _ => return Err(CommandError::Unknown(head.to_string())),
        };

        match parts.next() {
            Some(url) => Ok(Command::Fetch(Request::new(url, kind))),
            None => Err(CommandError::MissingUrl(kind)),
        }
    }
}
