//! Output realignment: map captured stdout back onto code segments.

use anyhow::{Result, bail};

use crate::core::separator::SeparatorToken;

/// Split combined program output into exactly `segment_count` chunks.
///
/// Chunks are assigned by position. Each chunk is stripped of the newlines
/// surrounding it (the separator is printed on its own line). A chunk count
/// other than `segment_count` means the separator protocol broke and is an
/// error rather than something to pad or truncate.
pub fn realign_output(
    output: &str,
    token: &SeparatorToken,
    segment_count: usize,
) -> Result<Vec<String>> {
    let chunks: Vec<String> = output
        .split(token.as_str())
        .map(|chunk| chunk.trim_matches(|c| c == '\n' || c == '\r').to_string())
        .collect();

    if chunks.len() != segment_count {
        bail!(
            "realignment mismatch: expected {} output chunks, found {}",
            segment_count,
            chunks.len()
        );
    }
    Ok(chunks)
}

/// Output a run with no executed code would produce: `segment_count` empty chunks.
pub fn empty_output(token: &SeparatorToken, segment_count: usize) -> String {
    let separators = segment_count.saturating_sub(1);
    let mut out = String::new();
    for _ in 0..separators {
        out.push_str(token.as_str());
        out.push('\n');
    }
    out
}
