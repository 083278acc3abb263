//! Literate documentation renderer.
//!
//! Renders each matched source document to `<outDir>/<path>.md`, executing
//! its code against a forked chain and isolating documents from each other
//! with snapshot/revert.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use litdoc::batch::run_batch;
use litdoc::exit_codes;
use litdoc::io::chain::{JsonRpcChain, NoopChain};
use litdoc::io::config::{DEFAULT_CONFIG_FILE, load_config};
use litdoc::io::executor::{DisabledExecutor, ProcessExecutor};
use litdoc::logging;
use litdoc::render::RenderSettings;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "litdoc",
    version,
    about = "Render literate source documents to markdown"
)]
struct Cli {
    /// Directory receiving rendered markdown.
    out_dir: Option<PathBuf>,

    /// Glob patterns of documents to render, in order (e.g. `docs/*.ts`).
    patterns: Vec<String>,

    /// Config file, relative to the working directory.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Skip execution and chain access; output blocks stay empty. Same as `NO_EVAL=1`.
    #[arg(long)]
    no_eval: bool,

    /// Override `chain.rpc_url`.
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override `executor.timeout_secs`.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::FAILED
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let Some(out_dir) = cli.out_dir.as_ref().filter(|_| !cli.patterns.is_empty()) else {
        Cli::command().print_help().context("print usage")?;
        println!();
        return Ok(exit_codes::OK);
    };

    let root = std::env::current_dir().context("resolve working directory")?;
    let mut cfg = load_config(&root.join(&cli.config))?;
    if let Some(url) = &cli.rpc_url {
        cfg.chain.rpc_url = url.clone();
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        cfg.executor.timeout_secs = timeout_secs;
    }
    cfg.validate()?;

    let no_eval = cli.no_eval || no_eval_from_env();
    let settings = RenderSettings::from_config(&root, &root.join(out_dir), &cfg);
    info!(no_eval, patterns = ?cli.patterns, "rendering documents");

    let summary = if no_eval {
        run_batch(&settings, &cli.patterns, &DisabledExecutor, &NoopChain)?
    } else {
        let executor = ProcessExecutor::new(&root, &cfg.executor);
        let chain = JsonRpcChain::new(
            &cfg.chain.rpc_url,
            Duration::from_secs(cfg.chain.request_timeout_secs),
        )?;
        run_batch(&settings, &cli.patterns, &executor, &chain)?
    };

    println!("{}", summary.report_line());
    if let Some(reason) = &summary.aborted {
        eprintln!("aborted: {reason}");
        return Ok(exit_codes::ISOLATION_LOST);
    }
    Ok(exit_codes::OK)
}

fn no_eval_from_env() -> bool {
    std::env::var("NO_EVAL").is_ok_and(|value| value == "1")
}
