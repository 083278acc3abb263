//! Orchestration for rendering a single document.
//!
//! Preprocess includes, split into segments, execute the code as one unit,
//! realign the captured output and emit markdown. Isolation on the shared
//! chain is the batch driver's concern, not this module's.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::markdown::{EmitOptions, emit_markdown};
use crate::core::realign::realign_output;
use crate::core::segment::{CodeBlock, code_segments, split_segments};
use crate::core::separator::SeparatorToken;
use crate::core::unit::{UnitTemplates, build_unit};
use crate::io::config::LitdocConfig;
use crate::io::executor::CodeExecutor;
use crate::io::files::{output_path, read_front_matter, relative_source};
use crate::io::preprocess::expand_includes;

/// Everything needed to render documents for one batch.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Project root; source paths are relative to it.
    pub root: PathBuf,
    /// Directory receiving rendered markdown.
    pub out_dir: PathBuf,
    /// Text prepended to every rendered document.
    pub front_matter: String,
    pub emit: EmitOptions,
    pub prelude: String,
    pub separator_statement: String,
    /// Separator for this run; shared by every document in the batch.
    pub token: SeparatorToken,
}

impl RenderSettings {
    /// Build settings from config, reading the front matter file (best effort).
    pub fn from_config(root: &Path, out_dir: &Path, cfg: &LitdocConfig) -> Self {
        let front_matter = read_front_matter(&root.join(&cfg.render.front_matter));
        Self {
            root: root.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
            front_matter,
            emit: EmitOptions {
                code_language: cfg.render.code_language.clone(),
                source_extensions: cfg.render.source_extensions.clone(),
                output_extension: cfg.render.output_extension.clone(),
                no_output_marker: cfg.render.no_output_marker.clone(),
            },
            prelude: cfg.executor.prelude.clone(),
            separator_statement: cfg.executor.separator_statement.clone(),
            token: SeparatorToken::random(),
        }
    }

    fn templates(&self) -> UnitTemplates<'_> {
        UnitTemplates {
            prelude: &self.prelude,
            separator_statement: &self.separator_statement,
        }
    }
}

/// A rendered document, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDoc {
    pub source: PathBuf,
    pub output_path: PathBuf,
    pub markdown: String,
}

/// Render one document. `source` is relative to `settings.root`, or absolute inside it.
#[instrument(skip_all, fields(doc = %source.display()))]
pub fn render_document<E: CodeExecutor + ?Sized>(
    settings: &RenderSettings,
    executor: &E,
    source: &Path,
) -> Result<RenderedDoc> {
    let relative = relative_source(&settings.root, source)?;
    let output_path = output_path(
        &settings.root,
        &settings.out_dir,
        &relative,
        &settings.emit.output_extension,
    )?;

    let text = expand_includes(&settings.root.join(source)).context("preprocess")?;
    let segments = split_segments(&text).context("split segments")?;

    let code: Vec<String> = code_segments(&segments)
        .map(|segment| CodeBlock::from_segment(&segment.text, &settings.emit.no_output_marker).code)
        .collect();
    let segment_count = code.len();
    debug!(segments = segments.len(), code_segments = segment_count, "document split");

    let unit = build_unit(&relative, code, &settings.token, settings.templates())
        .context("build execution unit")?;
    let stdout = executor.execute(&unit).context("execute")?;
    let outputs = realign_output(&stdout, &settings.token, segment_count)?;

    let markdown = emit_markdown(&settings.front_matter, &segments, &outputs, &settings.emit)
        .context("emit markdown")?;
    info!(output = %output_path.display(), "document rendered");

    Ok(RenderedDoc {
        source: source.to_path_buf(),
        output_path,
        markdown,
    })
}
