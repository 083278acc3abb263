//! Input discovery and output writing.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Expand file patterns (relative to `root`) into a deduplicated file list.
///
/// Supports `*` and `?` within a path component and `**` across components.
/// A pattern without wildcards is taken literally, even if the file does not
/// exist, so the failure surfaces when that document is rendered. Order
/// follows the pattern order; matches of one pattern are sorted by path.
pub fn expand_patterns(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
        let matches = if has_wildcard(pattern) {
            glob_files(root, pattern)?
        } else {
            vec![PathBuf::from(pattern)]
        };
        if matches.is_empty() {
            warn!(pattern, "pattern matched no files");
        }
        for path in matches {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    debug!(count = files.len(), "expanded patterns");
    Ok(files)
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

fn glob_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let regex = glob_regex(pattern)?;
    let base: PathBuf = Path::new(pattern)
        .components()
        .take_while(|c| !has_wildcard(&c.as_os_str().to_string_lossy()))
        .collect();
    let walk_root = root.join(&base);
    if !walk_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(&walk_root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", walk_root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let candidate = if Path::new(pattern).is_absolute() {
            entry.path().to_path_buf()
        } else {
            match entry.path().strip_prefix(root) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => continue,
            }
        };
        if regex.is_match(&slash_path(&candidate)) {
            matches.push(candidate);
        }
    }
    matches.sort();
    Ok(matches)
}

/// Translate a glob into an anchored regex over `/`-separated paths.
fn glob_regex(pattern: &str) -> Result<Regex> {
    let mut out = String::from("^");
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    Regex::new(&out).with_context(|| format!("compile glob {pattern}"))
}

fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `source` as a path relative to `root`.
///
/// Absolute sources must lie inside `root`; no source may escape it.
pub fn relative_source(root: &Path, source: &Path) -> Result<PathBuf> {
    let relative = if source.is_absolute() {
        source
            .strip_prefix(root)
            .map_err(|_| anyhow!("{} is outside {}", source.display(), root.display()))?
    } else {
        source
    };
    if relative
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        bail!("{} escapes the project root", source.display());
    }
    Ok(relative.to_path_buf())
}

/// Output location for a source document: `<out_dir>/<source>.<extension>`.
pub fn output_path(root: &Path, out_dir: &Path, source: &Path, extension: &str) -> Result<PathBuf> {
    let relative = relative_source(root, source)?;
    let mut name = relative.into_os_string();
    name.push(".");
    name.push(extension);
    Ok(out_dir.join(name))
}

/// Read the shared front matter. A missing file yields empty front matter.
pub fn read_front_matter(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no front matter");
            String::new()
        }
        Err(err) => {
            warn!(path = %path.display(), err = %err, "unreadable front matter, using none");
            String::new()
        }
    }
}

/// Write a rendered document, replacing any previous version.
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}
