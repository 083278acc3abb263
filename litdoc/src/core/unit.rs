//! Execution unit construction.
//!
//! All code segments of a document run as one program. Between consecutive
//! segments the unit prints the separator token through an output sink set
//! up by the prelude, so `N` segments produce `N - 1` separators.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::{Environment, UndefinedBehavior, context};

use crate::core::separator::SeparatorToken;

/// Language-specific snippets injected around the document's code.
///
/// Both are minijinja templates. `prelude` sees `entry_file`;
/// `separator_statement` sees `token` (raw) and `token_json` (quoted literal).
#[derive(Debug, Clone, Copy)]
pub struct UnitTemplates<'a> {
    pub prelude: &'a str,
    pub separator_statement: &'a str,
}

/// The synthetic program run for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUnit {
    /// Document path relative to the project root.
    pub logical_name: PathBuf,
    /// Full program text: prelude, then segments joined by separator statements.
    pub source: String,
    /// The code segments, in document order.
    pub segments: Vec<String>,
    pub token: SeparatorToken,
}

impl ExecutionUnit {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// Assemble the execution unit for a document's code segments.
pub fn build_unit(
    logical_name: &Path,
    segments: Vec<String>,
    token: &SeparatorToken,
    templates: UnitTemplates<'_>,
) -> Result<ExecutionUnit> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_template("prelude", templates.prelude)
        .context("parse prelude template")?;
    env.add_template("separator", templates.separator_statement)
        .context("parse separator statement template")?;

    let entry_file = logical_name.to_string_lossy();
    let prelude = env
        .get_template("prelude")?
        .render(context! { entry_file => entry_file.as_ref() })
        .context("render prelude")?;
    let separator = env
        .get_template("separator")?
        .render(context! {
            token => token.as_str(),
            token_json => token.json_literal(),
        })
        .context("render separator statement")?;

    let mut source = String::new();
    if !prelude.trim().is_empty() {
        source.push_str(prelude.trim_end());
        source.push('\n');
    }
    for (idx, segment) in segments.iter().enumerate() {
        if idx > 0 {
            source.push('\n');
            source.push_str(separator.trim());
            source.push('\n');
        }
        source.push_str(segment);
        source.push('\n');
    }

    Ok(ExecutionUnit {
        logical_name: logical_name.to_path_buf(),
        source,
        segments,
        token: token.clone(),
    })
}
