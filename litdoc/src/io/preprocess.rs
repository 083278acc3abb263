//! Include preprocessor.
//!
//! Expands `//// {"include": "..."}` directives recursively. Included text
//! is itself expanded first, then its relative imports are rewritten so they
//! still resolve from the including file's directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument, warn};

use crate::core::directive::{Directive, is_relative_specifier, parse_directive_line};
use crate::core::paths::{normalize, parent_dir, rewrite_relative_imports};

/// Read `path` and return its text with every include directive expanded.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn expand_includes(path: &Path) -> Result<String> {
    let mut stack = Vec::new();
    expand_file(path, &mut stack)
}

fn expand_file(path: &Path, stack: &mut Vec<PathBuf>) -> Result<String> {
    let identity = file_identity(path);
    if let Some(pos) = stack.iter().position(|entry| *entry == identity) {
        let chain = stack[pos..]
            .iter()
            .chain(std::iter::once(&identity))
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        bail!("circular include: {chain}");
    }

    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    stack.push(identity);

    let dir = parent_dir(path);
    let mut out = String::with_capacity(text.len());
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        let directive = parse_directive_line(line)
            .with_context(|| format!("{}:{}: invalid directive", path.display(), idx + 1))?;
        match directive {
            None => out.push_str(line),
            Some(Directive::Include { path: target }) => {
                if !is_relative_specifier(&target) {
                    warn!(target = %target, file = %path.display(), "bare include left in place, not expanded");
                    out.push_str(line);
                    continue;
                }
                let included = normalize(&dir.join(&target));
                debug!(included = %included.display(), "expanding include");
                let expanded = expand_file(&included, stack)
                    .with_context(|| format!("include {} from {}", target, path.display()))?;
                let rewritten = rewrite_relative_imports(&expanded, &parent_dir(&included), &dir);
                out.push_str(&rewritten);
                if line.ends_with('\n') && !rewritten.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }

    stack.pop();
    Ok(out)
}

/// Stable identity for cycle detection: canonical path when it exists.
fn file_identity(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| normalize(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::DocTree;

    #[test]
    fn file_without_directives_is_unchanged() {
        let tree = DocTree::new().expect("tree");
        let path = tree.write("docs/a.ts", "const a = 1;\n").expect("write");
        assert_eq!(expand_includes(&path).expect("expand"), "const a = 1;\n");
    }

    #[test]
    fn include_splices_text_and_rewrites_imports() {
        let tree = DocTree::new().expect("tree");
        let a = tree
            .write(
                "docs/x.ts",
                "before();\n//// { \"include\": \"./common/b.ts\" }\nafter();\n",
            )
            .expect("write a");
        tree.write(
            "docs/common/b.ts",
            "import { c } from './c';\nimport { sdk } from '@pendle/sdk-v2';\nuse(c);",
        )
        .expect("write b");

        let expanded = expand_includes(&a).expect("expand");
        assert_eq!(
            expanded,
            "before();\nimport { c } from './common/c';\nimport { sdk } from '@pendle/sdk-v2';\nuse(c);\nafter();\n"
        );
    }

    #[test]
    fn nested_includes_are_fully_expanded() {
        let tree = DocTree::new().expect("tree");
        let a = tree
            .write("docs/x.ts", "//// {\"include\": \"./common/b.ts\"}\n")
            .expect("write a");
        tree.write(
            "docs/common/b.ts",
            "//// {\"include\": \"./deep/c.ts\"}\nb();\n",
        )
        .expect("write b");
        tree.write("docs/common/deep/c.ts", "import u from '../util';\nc();\n")
            .expect("write c");

        let expanded = expand_includes(&a).expect("expand");
        assert_eq!(expanded, "import u from './common/util';\nc();\nb();\n");
    }

    #[test]
    fn bare_include_is_left_in_place() {
        let tree = DocTree::new().expect("tree");
        let line = "//// {\"include\": \"some-package\"}\n";
        let a = tree.write("docs/x.ts", line).expect("write");
        assert_eq!(expand_includes(&a).expect("expand"), line);
    }

    #[test]
    fn circular_include_fails_with_chain() {
        let tree = DocTree::new().expect("tree");
        let a = tree
            .write("docs/a.ts", "//// {\"include\": \"./b.ts\"}\n")
            .expect("write a");
        tree.write("docs/b.ts", "//// {\"include\": \"./a.ts\"}\n")
            .expect("write b");

        let err = expand_includes(&a).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("circular include"), "{message}");
        assert!(message.contains("a.ts -> "), "{message}");
    }

    #[test]
    fn same_file_included_twice_is_not_a_cycle() {
        let tree = DocTree::new().expect("tree");
        let a = tree
            .write(
                "docs/a.ts",
                "//// {\"include\": \"./b.ts\"}\n//// {\"include\": \"./b.ts\"}\n",
            )
            .expect("write a");
        tree.write("docs/b.ts", "b();\n").expect("write b");
        assert_eq!(expand_includes(&a).expect("expand"), "b();\nb();\n");
    }

    #[test]
    fn malformed_directive_reports_file_and_line() {
        let tree = DocTree::new().expect("tree");
        let a = tree
            .write("docs/a.ts", "ok();\n//// {\"include\": }\n")
            .expect("write");
        let err = expand_includes(&a).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("a.ts:2: invalid directive"), "{message}");
    }

    #[test]
    fn missing_include_target_is_an_error() {
        let tree = DocTree::new().expect("tree");
        let a = tree
            .write("docs/a.ts", "//// {\"include\": \"./gone.ts\"}\n")
            .expect("write");
        let err = expand_includes(&a).unwrap_err();
        assert!(format!("{err:#}").contains("gone.ts"));
    }
}
