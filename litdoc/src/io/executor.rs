//! Executor abstraction for running a document's code.
//!
//! The [`CodeExecutor`] trait decouples rendering from the actual runtime
//! (currently a configurable command such as `yarn ts-node`). Tests use
//! scripted executors that return predetermined output without spawning
//! processes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, error, info, instrument, warn};

use crate::core::realign::empty_output;
use crate::core::unit::ExecutionUnit;
use crate::io::config::ExecutorConfig;
use crate::io::process::{ProcessOutput, run_with_timeout};

/// Runs an execution unit and returns everything it printed to stdout.
pub trait CodeExecutor {
    fn execute(&self, unit: &ExecutionUnit) -> Result<String>;
}

/// Executor that writes the unit to disk and runs it as a child process.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    /// Project root; the command runs here.
    root: PathBuf,
    command: Vec<String>,
    work_dir: PathBuf,
    extension: String,
    timeout: Duration,
    output_limit_bytes: usize,
    /// Unit path -> document that wrote it during this run.
    claimed: RefCell<HashMap<PathBuf, PathBuf>>,
}

impl ProcessExecutor {
    pub fn new(root: &Path, cfg: &ExecutorConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            command: cfg.command.clone(),
            work_dir: root.join(&cfg.work_dir),
            extension: cfg.extension.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            output_limit_bytes: cfg.output_limit_bytes,
            claimed: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Where the unit for `logical_name` is written. Mirrors the document's
    /// relative path (with the unit extension) so units can import units
    /// rendered earlier, e.g. `./playground.mjs`.
    ///
    /// `logical_name` must be relative and stay inside the work directory.
    pub fn unit_path(&self, logical_name: &Path) -> Result<PathBuf> {
        let escapes = logical_name.components().any(|c| {
            matches!(
                c,
                Component::RootDir | Component::Prefix(_) | Component::ParentDir
            )
        });
        if escapes || logical_name.as_os_str().is_empty() {
            bail!(
                "unit name {} must be a relative path inside the work dir",
                logical_name.display()
            );
        }
        Ok(self
            .work_dir
            .join(logical_name)
            .with_extension(&self.extension))
    }

    /// Reserve `unit_path` for `logical_name`; two documents differing only
    /// in extension would otherwise overwrite each other's unit and log.
    fn claim(&self, unit_path: &Path, logical_name: &Path) -> Result<()> {
        let mut claimed = self.claimed.borrow_mut();
        match claimed.get(unit_path) {
            Some(owner) if owner != logical_name => bail!(
                "{} and {} both map to unit {}",
                owner.display(),
                logical_name.display(),
                unit_path.display()
            ),
            Some(_) => Ok(()),
            None => {
                claimed.insert(unit_path.to_path_buf(), logical_name.to_path_buf());
                Ok(())
            }
        }
    }
}

impl CodeExecutor for ProcessExecutor {
    #[instrument(skip_all, fields(doc = %unit.logical_name.display(), timeout_secs = self.timeout.as_secs()))]
    fn execute(&self, unit: &ExecutionUnit) -> Result<String> {
        let unit_path = self.unit_path(&unit.logical_name)?;
        self.claim(&unit_path, &unit.logical_name)?;
        if let Some(parent) = unit_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create work dir {}", parent.display()))?;
        }
        fs::write(&unit_path, &unit.source)
            .with_context(|| format!("write unit {}", unit_path.display()))?;
        info!(unit = %unit_path.display(), segments = unit.segment_count(), "executing unit");

        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("executor command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).arg(&unit_path).current_dir(&self.root);

        let output = run_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {}", program))?;

        write_execution_log(&unit_path.with_extension("log"), &output)?;

        if output.timed_out {
            error!(timeout_secs = self.timeout.as_secs(), "execution timed out");
            return Err(anyhow!("execution timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            error!(
                exit_code = ?output.status.code(),
                stderr = %output.stderr_text(),
                "execution failed"
            );
            return Err(anyhow!(
                "execution failed with status {:?}",
                output.status.code()
            ));
        }
        if !output.stderr.is_empty() {
            warn!(stderr = %output.stderr_text(), "execution wrote to stderr");
        }
        if output.stdout_truncated > 0 {
            return Err(anyhow!(
                "stdout exceeded {} bytes; output cannot be realigned",
                self.output_limit_bytes
            ));
        }

        debug!("execution completed successfully");
        Ok(output.stdout_text())
    }
}

/// Executor used when evaluation is disabled: runs nothing and reports
/// empty output for every segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledExecutor;

impl CodeExecutor for DisabledExecutor {
    fn execute(&self, unit: &ExecutionUnit) -> Result<String> {
        debug!(doc = %unit.logical_name.display(), "evaluation disabled, skipping execution");
        Ok(empty_output(&unit.token, unit.segment_count()))
    }
}

fn write_execution_log(path: &Path, output: &ProcessOutput) -> Result<()> {
    let mut buf = String::new();
    buf.push_str("=== stdout ===\n");
    buf.push_str(&output.stdout_text());
    if output.stdout_truncated > 0 {
        buf.push_str(&format!("\n[stdout truncated {} bytes]\n", output.stdout_truncated));
    }
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(&output.stderr_text());
    if output.stderr_truncated > 0 {
        buf.push_str(&format!("\n[stderr truncated {} bytes]\n", output.stderr_truncated));
    }
    if output.timed_out {
        buf.push_str("\n[execution timed out]\n");
    }
    fs::write(path, buf).with_context(|| format!("write execution log {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realign::realign_output;
    use crate::core::separator::SeparatorToken;
    use crate::core::unit::{UnitTemplates, build_unit};

    const SH_TEMPLATES: UnitTemplates<'static> = UnitTemplates {
        prelude: "",
        separator_statement: "cat <<'LITDOC_EOF'\n{{ token }}\nLITDOC_EOF",
    };

    fn sh_config() -> ExecutorConfig {
        ExecutorConfig {
            command: vec!["sh".to_string()],
            extension: "sh".to_string(),
            work_dir: "work".to_string(),
            timeout_secs: 10,
            output_limit_bytes: 10_000,
            ..ExecutorConfig::default()
        }
    }

    fn sh_unit(segments: &[&str]) -> ExecutionUnit {
        build_unit(
            Path::new("docs/demo.ts"),
            segments.iter().map(|s| s.to_string()).collect(),
            &SeparatorToken::with_suffix("sh"),
            SH_TEMPLATES,
        )
        .expect("build unit")
    }

    #[test]
    fn disabled_executor_yields_empty_chunks() {
        let unit = sh_unit(&["echo a", "echo b", "echo c"]);
        let output = DisabledExecutor.execute(&unit).expect("execute");
        let chunks = realign_output(&output, &unit.token, 3).expect("realign");
        assert_eq!(chunks, vec!["", "", ""]);
    }

    #[test]
    fn unit_path_mirrors_logical_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = ProcessExecutor::new(temp.path(), &sh_config());
        assert_eq!(
            executor.unit_path(Path::new("docs/demo.ts")).expect("unit path"),
            temp.path().join("work/docs/demo.sh")
        );
    }

    #[test]
    fn unit_path_rejects_names_outside_work_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = ProcessExecutor::new(temp.path(), &sh_config());
        let absolute = temp.path().join("docs/demo.ts");
        assert!(executor.unit_path(&absolute).is_err());
        assert!(executor.unit_path(Path::new("../demo.ts")).is_err());
    }

    #[test]
    fn documents_sharing_a_unit_path_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = ProcessExecutor::new(temp.path(), &sh_config());
        let ts = executor.unit_path(Path::new("docs/a.ts")).expect("ts");
        let mts = executor.unit_path(Path::new("docs/a.mts")).expect("mts");
        assert_eq!(ts, mts);

        executor.claim(&ts, Path::new("docs/a.ts")).expect("first claim");
        executor.claim(&ts, Path::new("docs/a.ts")).expect("same document again");
        let err = executor.claim(&mts, Path::new("docs/a.mts")).unwrap_err();
        assert!(err.to_string().contains("both map to unit"));
    }

    #[cfg(unix)]
    #[test]
    fn process_executor_output_realigns_per_segment() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = ProcessExecutor::new(temp.path(), &sh_config());
        let unit = sh_unit(&["echo one", "true", "echo three; echo more"]);

        let output = executor.execute(&unit).expect("execute");
        let chunks = realign_output(&output, &unit.token, 3).expect("realign");
        assert_eq!(chunks, vec!["one", "", "three\nmore"]);

        let log = fs::read_to_string(temp.path().join("work/docs/demo.log")).expect("log");
        assert!(log.starts_with("=== stdout ===\none\n"));
    }

    #[cfg(unix)]
    #[test]
    fn process_executor_surfaces_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = ProcessExecutor::new(temp.path(), &sh_config());
        let unit = sh_unit(&["echo partial", "echo boom >&2; exit 7"]);

        let err = executor.execute(&unit).unwrap_err();
        assert!(err.to_string().contains("status Some(7)"));

        let log = fs::read_to_string(temp.path().join("work/docs/demo.log")).expect("log");
        assert!(log.contains("=== stderr ===\nboom"));
    }

    #[cfg(unix)]
    #[test]
    fn process_executor_times_out() {
        let temp = tempfile::tempdir().expect("tempdir");
        let executor = ProcessExecutor::new(temp.path(), &sh_config())
            .with_timeout(Duration::from_millis(200));
        let unit = sh_unit(&["sleep 30"]);

        let err = executor.execute(&unit).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
