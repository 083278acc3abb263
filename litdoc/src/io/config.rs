//! Renderer configuration stored in `litdoc.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "litdoc.toml";

// Valid as both TypeScript and plain JavaScript. When the unit is imported
// rather than run, its module-scoped `console` is a silent stand-in; the
// global console is never touched.
const DEFAULT_PRELUDE: &str = r#"// litdoc unit: {{ entry_file }}
import { realpathSync as __litdocRealpath } from 'node:fs';
import { fileURLToPath as __litdocFileURLToPath } from 'node:url';
const __litdocIsEntry = (() => {
    try {
        return __litdocRealpath(__litdocFileURLToPath(import.meta.url)) === __litdocRealpath(process.argv[1] ?? '');
    } catch {
        return false;
    }
})();
const console = __litdocIsEntry
    ? globalThis.console
    : new Proxy(globalThis.console, {
          get: (target, key) => {
              const value = Reflect.get(target, key);
              return typeof value === 'function' ? () => undefined : value;
          },
      });"#;

const DEFAULT_SEPARATOR_STATEMENT: &str =
    "if (__litdocIsEntry) process.stdout.write({{ token_json }} + '\\n');";

/// Renderer configuration (TOML).
///
/// Missing fields default to values suited for TypeScript documents run
/// through `ts-node` against a local forked node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LitdocConfig {
    pub executor: ExecutorConfig,
    pub chain: ChainConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Command used to run a generated unit; the unit path is appended.
    pub command: Vec<String>,

    /// Extension given to generated units.
    pub extension: String,

    /// Directory (relative to the project root) for generated units and logs.
    pub work_dir: String,

    /// Per-document wall-clock limit in seconds.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Template injected before the document's code.
    pub prelude: String,

    /// Template for the statement printing the separator token.
    pub separator_statement: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command: ["yarn", "ts-node", "--emit", "--esm", "-P", "./docs/tsconfig.json"]
                .into_iter()
                .map(String::from)
                .collect(),
            extension: "mts".to_string(),
            work_dir: "temp-dir".to_string(),
            timeout_secs: 10 * 60,
            output_limit_bytes: 1_000_000,
            prelude: DEFAULT_PRELUDE.to_string(),
            separator_statement: DEFAULT_SEPARATOR_STATEMENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint of the forked node.
    pub rpc_url: String,

    pub request_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Markdown prepended to every rendered document; missing file means none.
    pub front_matter: String,

    /// Info string for code fences.
    pub code_language: String,

    /// Source extensions whose relative links are rewritten to rendered output.
    pub source_extensions: Vec<String>,

    /// Extension appended to each rendered document's path.
    pub output_extension: String,

    /// Last-line comment that hides a code segment's output.
    pub no_output_marker: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            front_matter: "docs/front-matter.md".to_string(),
            code_language: "ts".to_string(),
            source_extensions: vec!["ts".to_string(), "mts".to_string()],
            output_extension: "md".to_string(),
            no_output_marker: "// @no-output".to_string(),
        }
    }
}

impl LitdocConfig {
    pub fn validate(&self) -> Result<()> {
        if self.executor.command.is_empty() || self.executor.command[0].trim().is_empty() {
            return Err(anyhow!("executor.command must be a non-empty array"));
        }
        if self.executor.timeout_secs == 0 {
            return Err(anyhow!("executor.timeout_secs must be > 0"));
        }
        if self.executor.output_limit_bytes == 0 {
            return Err(anyhow!("executor.output_limit_bytes must be > 0"));
        }
        if self.executor.extension.trim().is_empty() {
            return Err(anyhow!("executor.extension must not be empty"));
        }
        if self.executor.work_dir.trim().is_empty() {
            return Err(anyhow!("executor.work_dir must not be empty"));
        }
        if self.chain.request_timeout_secs == 0 {
            return Err(anyhow!("chain.request_timeout_secs must be > 0"));
        }
        if self.render.output_extension.trim().is_empty() {
            return Err(anyhow!("render.output_extension must not be empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LitdocConfig::default()`.
pub fn load_config(path: &Path) -> Result<LitdocConfig> {
    if !path.exists() {
        let cfg = LitdocConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LitdocConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
