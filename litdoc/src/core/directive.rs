//! Inclusion directives embedded in source documents.
//!
//! A directive is a line comment starting with `////` whose remainder is a
//! JSON object, e.g.
//!
//! ```text
//! //// { "include": "./common/setup.ts" }
//! ```
//!
//! The set of directive kinds is closed; unknown keys are rejected.

use anyhow::{Result, anyhow, bail};
use serde_json::Value;

/// Line prefix introducing a directive.
pub const DIRECTIVE_PREFIX: &str = "////";

/// A parsed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Splice another file's preprocessed content in place of this line.
    Include { path: String },
}

/// Parse a single line as a directive.
///
/// Returns `Ok(None)` for lines that are not directives (including `////`
/// comments that carry no JSON object).
pub fn parse_directive_line(line: &str) -> Result<Option<Directive>> {
    let Some(rest) = line.trim_start().strip_prefix(DIRECTIVE_PREFIX) else {
        return Ok(None);
    };
    let payload = rest.trim();
    if !payload.starts_with('{') {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(payload)
        .map_err(|err| anyhow!("malformed directive json: {err}"))?;
    let Value::Object(fields) = value else {
        bail!("directive payload must be a json object");
    };

    let mut include = None;
    for (key, value) in &fields {
        match key.as_str() {
            "include" => match value {
                Value::String(path) if !path.trim().is_empty() => {
                    include = Some(path.trim().to_string());
                }
                Value::String(_) => bail!("directive `include` must not be empty"),
                other => bail!("directive `include` must be a string, got {other}"),
            },
            unknown => bail!("unknown directive key `{unknown}`"),
        }
    }

    match include {
        Some(path) => Ok(Some(Directive::Include { path })),
        None => bail!("directive has no recognized key"),
    }
}

/// True for module specifiers resolved against the including file (`./x`, `../x`).
///
/// Anything else is a bare specifier naming an external module.
pub fn is_relative_specifier(spec: &str) -> bool {
    spec.starts_with('.')
}
