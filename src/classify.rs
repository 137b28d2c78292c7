//! Failure classification
//!
//! Maps raw backend diagnostics to an [`ErrorKind`] using an ordered table of
//! `(pattern, kind)` rules; the first matching rule wins and text matching no
//! rule is [`ErrorKind::Unknown`]. Patterns are case-insensitive regular
//! expressions. Rules from [`ClassifierConfig`] are checked before the
//! built-in table so origin-specific phrasing can override it.

use crate::config::{ClassifierConfig, ClassifierRule};
use crate::error::{Error, Result};
use crate::types::ErrorKind;
use regex::{Regex, RegexBuilder};

/// Built-in rules, in priority order
///
/// Specific phrasings come before generic ones: "ffmpeg not found" must be
/// `Unsupported`, not `NotFound`, and a private video must be `AccessDenied`
/// even though yt-dlp prefixes it with "Video unavailable".
pub const DEFAULT_RULES: &[(&str, ErrorKind)] = &[
    // Bot challenges and login walls
    (r"sign in to confirm you.{0,3}re not a bot", ErrorKind::AccessDenied),
    (r"confirm you.{0,3}re not a robot", ErrorKind::AccessDenied),
    (r"captcha", ErrorKind::AccessDenied),
    (r"private video", ErrorKind::AccessDenied),
    (r"members[- ]only|join this channel", ErrorKind::AccessDenied),
    (r"sign in to confirm your age|age[- ]restricted", ErrorKind::AccessDenied),
    (r"login required|requires? (a )?login|requires? authentication|use --cookies", ErrorKind::AccessDenied),
    (r"http error 40[13]", ErrorKind::AccessDenied),
    // Things the service cannot handle, checked before generic "not found"
    (r"unsupported url", ErrorKind::Unsupported),
    (r"ff(mpeg|probe)( and ff(mpeg|probe))? (not found|could not be found|is not installed)", ErrorKind::Unsupported),
    (r"requested format is not available", ErrorKind::Unsupported),
    (r"no video formats found", ErrorKind::Unsupported),
    (r"\bdrm\b", ErrorKind::Unsupported),
    // Missing resources
    (r"http error 404|http error 410", ErrorKind::NotFound),
    (r"video unavailable|video is unavailable", ErrorKind::NotFound),
    (r"does not exist|has been removed|was deleted", ErrorKind::NotFound),
    (r"\bnot found\b", ErrorKind::NotFound),
    // Network faults
    (r"timed? ?out", ErrorKind::Transient),
    (r"connection (reset|refused|aborted)|broken pipe", ErrorKind::Transient),
    (r"temporary failure in name resolution|name or service not known|network is unreachable", ErrorKind::Transient),
    (r"incomplete ?read|unexpected eof|eof occurred", ErrorKind::Transient),
    (r"http error 429|too many requests", ErrorKind::Transient),
    (r"http error 5\d\d", ErrorKind::Transient),
    // Generic codec / postprocessing trouble
    (r"postprocessing:|conversion failed|codec", ErrorKind::Unsupported),
];

/// Ordered, table-driven failure classifier
///
/// Pure: the same text always yields the same kind.
#[derive(Clone, Debug)]
pub struct Classifier {
    rules: Vec<(Regex, ErrorKind)>,
}

impl Classifier {
    /// Classifier with only the built-in rules
    pub fn new() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .filter_map(|(pattern, kind)| compile(pattern).ok().map(|re| (re, *kind)))
            .collect();
        Self { rules }
    }

    /// Classifier with `extra` rules checked before the built-in ones
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an extra pattern does not compile.
    pub fn with_rules(extra: &[ClassifierRule]) -> Result<Self> {
        let mut rules = Vec::with_capacity(extra.len() + DEFAULT_RULES.len());
        for (index, rule) in extra.iter().enumerate() {
            let re = compile(&rule.pattern).map_err(|e| {
                Error::config(
                    format!("classifier.extra_rules[{index}].pattern"),
                    format!("invalid pattern {:?}: {}", rule.pattern, e),
                )
            })?;
            rules.push((re, rule.kind));
        }
        rules.extend(Self::new().rules);
        Ok(Self { rules })
    }

    /// Classifier from configuration
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        Self::with_rules(&config.extra_rules)
    }

    /// Map raw failure text to a kind
    pub fn classify(&self, raw: &str) -> ErrorKind {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(raw))
            .map(|(_, kind)| *kind)
            .unwrap_or(ErrorKind::Unknown)
    }

    /// Number of rules, extra and built-in
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
