//! Markdown emission for rendered documents.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::{Captures, Regex};

use crate::core::segment::{CodeBlock, Segment, SegmentKind};

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\((?P<target>[^)\s#]+)(?P<frag>#[^)\s]*)?\)").unwrap());

/// Formatting options for emitted markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Info string for code fences (e.g. `ts`).
    pub code_language: String,
    /// Extensions of source documents whose links get rewritten.
    pub source_extensions: Vec<String>,
    /// Extension appended to rendered documents (e.g. `md`).
    pub output_extension: String,
    /// Trailing code comment that suppresses the output block.
    pub no_output_marker: String,
}

/// Render a split document and its realigned outputs as markdown.
///
/// `outputs` holds one chunk per code segment, in order.
pub fn emit_markdown(
    front_matter: &str,
    segments: &[Segment],
    outputs: &[String],
    opts: &EmitOptions,
) -> Result<String> {
    let code_count = segments.iter().filter(|s| s.is_code()).count();
    if code_count != outputs.len() {
        bail!(
            "{} code segments but {} output chunks",
            code_count,
            outputs.len()
        );
    }

    let mut pieces = Vec::new();
    if !front_matter.trim().is_empty() {
        pieces.push(front_matter.trim_end().to_string());
    }

    let mut outputs = outputs.iter();
    for segment in segments {
        match segment.kind {
            SegmentKind::Prose => {
                if !segment.text.is_empty() {
                    pieces.push(rewrite_doc_links(&segment.text, opts));
                }
            }
            SegmentKind::Code => {
                let output = outputs.next().map(String::as_str).unwrap_or_default();
                let block = CodeBlock::from_segment(&segment.text, &opts.no_output_marker);
                if block.code.trim().is_empty() {
                    continue;
                }
                let mut piece = fenced(&block.code, &opts.code_language);
                if block.show_output && !output.trim().is_empty() {
                    piece.push_str("\nOutput:\n");
                    piece.push_str(&fenced(output, ""));
                }
                pieces.push(piece);
            }
        }
    }

    let mut markdown = pieces.join("\n\n");
    markdown.push('\n');
    Ok(markdown)
}

/// Point relative links at other source documents to their rendered output.
///
/// `[setup](./playground.ts#accounts)` becomes `[setup](./playground.ts.md#accounts)`.
pub fn rewrite_doc_links(prose: &str, opts: &EmitOptions) -> String {
    LINK_RE
        .replace_all(prose, |caps: &Captures| {
            let target = &caps["target"];
            let frag = caps.name("frag").map(|m| m.as_str()).unwrap_or_default();
            if is_source_document(target, &opts.source_extensions) {
                format!("]({target}.{}{frag})", opts.output_extension)
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn is_source_document(target: &str, extensions: &[String]) -> bool {
    if target.starts_with(['/', '#']) || has_scheme(target) {
        return false;
    }
    target
        .rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && extensions.iter().any(|e| e == ext))
        .unwrap_or(false)
}

/// `https:`, `mailto:` and the like: a scheme ends at the first `:` before any `/`.
fn has_scheme(target: &str) -> bool {
    match target.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && !scheme.contains('/')
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Wrap text in a backtick fence longer than any backtick run it contains.
fn fenced(text: &str, info: &str) -> String {
    let longest = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    format!("{fence}{info}\n{text}\n{fence}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::split_segments;

    fn opts() -> EmitOptions {
        EmitOptions {
            code_language: "ts".to_string(),
            source_extensions: vec!["ts".to_string(), "mts".to_string()],
            output_extension: "md".to_string(),
            no_output_marker: "// @no-output".to_string(),
        }
    }

    #[test]
    fn interleaves_prose_code_and_output() {
        let doc = "/* ===\n# Title\n=== */\nconsole.log(1);\n/* ===\nDone.\n=== */";
        let segments = split_segments(doc).expect("split");
        let outputs = vec![String::new(), "1".to_string(), String::new()];
        let markdown = emit_markdown("", &segments, &outputs, &opts()).expect("emit");
        assert_eq!(
            markdown,
            "# Title\n\n```ts\nconsole.log(1);\n```\nOutput:\n```\n1\n```\n\nDone.\n"
        );
    }

    #[test]
    fn empty_output_has_no_output_block() {
        let segments = split_segments("const a = 1;").expect("split");
        let markdown =
            emit_markdown("", &segments, &["  \n".to_string()], &opts()).expect("emit");
        assert_eq!(markdown, "```ts\nconst a = 1;\n```\n");
    }

    #[test]
    fn no_output_marker_suppresses_output_block() {
        let segments = split_segments("noisy();\n// @no-output").expect("split");
        let markdown =
            emit_markdown("", &segments, &["lots of noise".to_string()], &opts()).expect("emit");
        assert_eq!(markdown, "```ts\nnoisy();\n```\n");
    }

    #[test]
    fn front_matter_is_prepended() {
        let segments = split_segments("a();").expect("split");
        let markdown =
            emit_markdown("---\ntitle: x\n---\n", &segments, &[String::new()], &opts())
                .expect("emit");
        assert!(markdown.starts_with("---\ntitle: x\n---\n\n```ts\n"));
    }

    #[test]
    fn output_with_backticks_gets_a_longer_fence() {
        let segments = split_segments("a();").expect("split");
        let markdown =
            emit_markdown("", &segments, &["```inner```".to_string()], &opts()).expect("emit");
        assert!(markdown.contains("Output:\n````\n```inner```\n````"));
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let segments = split_segments("a();\n/* === p === */\nb();").expect("split");
        let err = emit_markdown("", &segments, &[String::new()], &opts()).unwrap_err();
        assert!(err.to_string().contains("2 code segments but 1 output chunks"));
    }

    #[test]
    fn rewrites_links_to_source_documents() {
        let prose = "See [playground](./playground.ts) and [erc20](../docs/1.erc20.ts#setup).";
        assert_eq!(
            rewrite_doc_links(prose, &opts()),
            "See [playground](./playground.ts.md) and [erc20](../docs/1.erc20.ts.md#setup)."
        );
    }

    #[test]
    fn rewrites_sibling_links_without_dot_prefix() {
        let prose = "Next: [market](2.market-tutorial.ts) and [deep](guides/x.mts#top).";
        assert_eq!(
            rewrite_doc_links(prose, &opts()),
            "Next: [market](2.market-tutorial.ts.md) and [deep](guides/x.mts.md#top)."
        );
    }

    #[test]
    fn leaves_other_links_alone() {
        let prose = "[site](https://example.com/a.ts) [img](./logo.png) [usdc](https://etherscan.io/address/0xa0) [abs](/docs/a.ts) [mail](mailto:dev@a.ts)";
        assert_eq!(rewrite_doc_links(prose, &opts()), prose);
    }
}
