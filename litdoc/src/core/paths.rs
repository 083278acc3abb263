//! Lexical path arithmetic and import specifier rewriting.
//!
//! Paths here are never touched on disk: import targets are often
//! extensionless module specifiers that do not name a real file.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::core::directive::is_relative_specifier;

/// Matches `import ... from '<p>'`, `export ... from '<p>'` and `import '<p>'`.
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^(?P<head>[ \t]*(?:(?:import|export)\b[^'";]*?\bfrom[ \t]*|import[ \t]*))(?P<q>['"])(?P<spec>[^'"\n]+)['"]"#,
    )
    .unwrap()
});

/// Resolve `.` and `..` components without consulting the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Directory containing `path`, or `.` for bare file names.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Express `target` relative to directory `base`. Both are normalized first.
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target = normalize(target);
    let base = normalize(base);
    let target_parts: Vec<Component> = target
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let base_parts: Vec<Component> = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &target_parts[common..] {
        out.push(part.as_os_str());
    }
    out
}

/// Render a relative path as an import specifier (`./x`, `../x`), always with `/`.
pub fn module_specifier(relative: &Path) -> String {
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".to_string()
    } else if joined == ".." || joined.starts_with("../") {
        joined
    } else {
        format!("./{joined}")
    }
}

/// Rewrite relative import specifiers written for `from_dir` so they resolve
/// identically from `to_dir`. Bare specifiers are left untouched.
pub fn rewrite_relative_imports(text: &str, from_dir: &Path, to_dir: &Path) -> String {
    IMPORT_RE
        .replace_all(text, |caps: &Captures| {
            let spec = &caps["spec"];
            let quote = &caps["q"];
            let head = &caps["head"];
            if !is_relative_specifier(spec) {
                return caps[0].to_string();
            }
            let absolute = normalize(&from_dir.join(spec));
            let rewritten = module_specifier(&relative_to(&absolute, to_dir));
            format!("{head}{quote}{rewritten}{quote}")
        })
        .into_owned()
}
