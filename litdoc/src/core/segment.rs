//! Segment splitter for literate source documents.
//!
//! A document is a mix of code and prose. Prose lives inside block comments
//! fenced with a triple-equals marker:
//!
//! ```text
//! const a = 1;
//! /* ===
//! Some *markdown* prose.
//! === */
//! console.log(a);
//! ```
//!
//! Splitting always yields an odd number of segments, code first and code
//! last: `[code, prose, code, ..., code]`. Code segments may be empty.

use anyhow::{Result, bail};

/// Kind of a document segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    Prose,
}

/// A contiguous span of a document, trimmed of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
    /// Position in the split document (0-based).
    pub ordinal: usize,
}

impl Segment {
    pub fn is_code(&self) -> bool {
        self.kind == SegmentKind::Code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    InCode,
    InProse,
}

/// Split document text into alternating code and prose segments.
///
/// Fails on a prose block that is opened but never closed.
pub fn split_segments(text: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut state = ScanState::InCode;
    let mut offset = 0usize;

    loop {
        let rest = &text[offset..];
        match state {
            ScanState::InCode => match find_prose_open(rest) {
                Some((start, end)) => {
                    push_segment(&mut segments, SegmentKind::Code, &rest[..start]);
                    offset += end;
                    state = ScanState::InProse;
                }
                None => {
                    push_segment(&mut segments, SegmentKind::Code, rest);
                    break;
                }
            },
            ScanState::InProse => match find_prose_close(rest) {
                Some((start, end)) => {
                    push_segment(&mut segments, SegmentKind::Prose, &rest[..start]);
                    offset += end;
                    state = ScanState::InCode;
                }
                None => {
                    let line = line_of(text, offset);
                    bail!("unterminated prose block opened near line {line}");
                }
            },
        }
    }

    Ok(segments)
}

/// Iterate over the code segments of a split document, in order.
pub fn code_segments(segments: &[Segment]) -> impl Iterator<Item = &Segment> {
    segments.iter().filter(|segment| segment.is_code())
}

fn push_segment(segments: &mut Vec<Segment>, kind: SegmentKind, raw: &str) {
    segments.push(Segment {
        kind,
        text: raw.trim().to_string(),
        ordinal: segments.len(),
    });
}

/// Locate `/*` + optional whitespace + `===`, returning (marker start, marker end).
fn find_prose_open(rest: &str) -> Option<(usize, usize)> {
    for (idx, _) in rest.match_indices("/*") {
        let after = &rest[idx + 2..];
        let body = after.trim_start();
        if !body.starts_with("===") {
            continue;
        }
        let fence_start = rest.len() - body.len();
        let fence_len = body.len() - body.trim_start_matches('=').len();
        return Some((idx, fence_start + fence_len));
    }
    None
}

/// Locate `===` + optional whitespace + `*/`, returning (marker start, marker end).
fn find_prose_close(rest: &str) -> Option<(usize, usize)> {
    for (idx, _) in rest.match_indices("*/") {
        let before = rest[..idx].trim_end();
        if !before.ends_with("===") {
            continue;
        }
        let start = before.trim_end_matches('=').len();
        return Some((start, idx + 2));
    }
    None
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// A code segment prepared for display and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Code with the no-output marker removed.
    pub code: String,
    /// False when the segment ended with the no-output marker.
    pub show_output: bool,
}

impl CodeBlock {
    /// Strip a trailing no-output marker line from a code segment.
    pub fn from_segment(text: &str, no_output_marker: &str) -> Self {
        let marker = no_output_marker.trim();
        if marker.is_empty() {
            return Self {
                code: text.to_string(),
                show_output: true,
            };
        }

        let trimmed = text.trim_end();
        let (head, last_line) = match trimmed.rfind('\n') {
            Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
            None => ("", trimmed),
        };
        if last_line.trim() == marker {
            Self {
                code: head.trim_end().to_string(),
                show_output: false,
            }
        } else {
            Self {
                code: text.to_string(),
                show_output: true,
            }
        }
    }
}
