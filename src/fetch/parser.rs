//! Parser for yt-dlp command output

use std::path::PathBuf;

/// Upper bound on how much stderr is kept as failure detail
const MAX_DETAIL_LINES: usize = 20;

/// Extract the final artifact path from yt-dlp stdout
///
/// The backend runs with `--print after_move:filepath`, which prints the path
/// of the finished file as the last line once every post-processor is done.
/// Returns `None` when nothing was printed.
pub fn parse_output_path(stdout: &[u8]) -> Option<PathBuf> {
    let output = String::from_utf8_lossy(stdout);
    output
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty() && *line != "NA")
        .map(PathBuf::from)
}

/// Build the raw failure text for a failed yt-dlp run
///
/// Prefers the `ERROR:` lines yt-dlp writes to stderr; otherwise keeps the
/// tail of stderr, then stdout, and finally just the exit code.
pub fn failure_detail(stdout: &[u8], stderr: &[u8], exit_code: Option<i32>) -> String {
    let error_output = String::from_utf8_lossy(stderr);

    let error_lines: Vec<&str> = error_output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();
    if !error_lines.is_empty() {
        return error_lines.join("\n");
    }

    if let Some(tail) = tail(&error_output) {
        return tail;
    }
    if let Some(tail) = tail(&String::from_utf8_lossy(stdout)) {
        return tail;
    }

    match exit_code {
        Some(code) => format!("yt-dlp exited with code {code}"),
        None => "yt-dlp was terminated by a signal".to_string(),
    }
}

fn tail(text: &str) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(MAX_DETAIL_LINES);
    Some(lines[start..].join("\n"))
}
