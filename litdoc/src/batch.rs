//! Batch driver: render every matched document, one at a time.
//!
//! Documents share one mutable chain, so they are rendered strictly in
//! sequence, each inside its own snapshot/revert bracket. A failing document
//! is logged and skipped; a failed revert aborts the batch because later
//! documents would run against unknown state.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info, instrument};

use crate::io::chain::ChainState;
use crate::io::executor::CodeExecutor;
use crate::io::files::{expand_patterns, write_output};
use crate::io::isolation::{Isolated, run_isolated};
use crate::render::{RenderSettings, RenderedDoc, render_document};

/// A document that could not be rendered.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

/// Result of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Number of documents matched by the patterns.
    pub total: usize,
    /// Documents rendered and written.
    pub processed: usize,
    pub failures: Vec<FileFailure>,
    /// Set when the batch stopped early because chain state became unknown.
    pub aborted: Option<String>,
}

impl BatchSummary {
    /// The `<processed>/<total>` summary line.
    pub fn report_line(&self) -> String {
        format!("rendered {}/{} files", self.processed, self.total)
    }
}

/// Render all documents matched by `patterns`.
#[instrument(skip_all, fields(out_dir = %settings.out_dir.display()))]
pub fn run_batch<E, C>(
    settings: &RenderSettings,
    patterns: &[String],
    executor: &E,
    chain: &C,
) -> Result<BatchSummary>
where
    E: CodeExecutor + ?Sized,
    C: ChainState + ?Sized,
{
    let files = expand_patterns(&settings.root, patterns)?;
    let mut summary = BatchSummary {
        total: files.len(),
        ..BatchSummary::default()
    };
    info!(total = summary.total, "starting batch");

    for source in files {
        let outcome = run_isolated(chain, || render_document(settings, executor, &source));
        match outcome {
            Isolated::Ran(result) => record(&mut summary, source, result),
            Isolated::NotStarted(err) => {
                let err = err.context("snapshot before rendering");
                record(&mut summary, source, Err(err));
            }
            Isolated::StateLost { body, error: err } => {
                record(&mut summary, source.clone(), body);
                let reason = format!("revert after {} failed: {err:#}", source.display());
                error!(reason = %reason, "aborting batch");
                summary.aborted = Some(reason);
                break;
            }
        }
    }

    info!(
        processed = summary.processed,
        total = summary.total,
        failed = summary.failures.len(),
        "batch finished"
    );
    Ok(summary)
}

fn record(summary: &mut BatchSummary, source: PathBuf, result: Result<RenderedDoc>) {
    let written = result.and_then(|doc| {
        write_output(&doc.output_path, &doc.markdown)?;
        Ok(doc)
    });
    match written {
        Ok(doc) => {
            println!(
                "render: {} -> {}",
                doc.source.display(),
                doc.output_path.display()
            );
            summary.processed += 1;
        }
        Err(err) => {
            error!(doc = %source.display(), err = %format!("{err:#}"), "render failed");
            println!("failed: {}: {:#}", source.display(), err);
            summary.failures.push(FileFailure {
                path: source,
                error: err,
            });
        }
    }
}
