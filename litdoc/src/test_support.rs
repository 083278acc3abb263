//! Test-only helpers: temp document trees, scripted executors and fake chains.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, anyhow, bail};

use crate::core::markdown::EmitOptions;
use crate::core::separator::SeparatorToken;
use crate::core::unit::ExecutionUnit;
use crate::io::chain::{ChainState, SnapshotHandle};
use crate::io::config::RenderConfig;
use crate::io::executor::CodeExecutor;
use crate::render::RenderSettings;

/// A temporary project directory holding source documents.
pub struct DocTree {
    dir: tempfile::TempDir,
}

impl DocTree {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create tempdir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` at `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        let path = self.dir.path().join(relative);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }
}

/// Deterministic render settings rooted at `root`, writing to `root/out`.
pub fn test_settings(root: &Path) -> RenderSettings {
    let render = RenderConfig::default();
    RenderSettings {
        root: root.to_path_buf(),
        out_dir: root.join("out"),
        front_matter: String::new(),
        emit: EmitOptions {
            code_language: render.code_language,
            source_extensions: render.source_extensions,
            output_extension: render.output_extension,
            no_output_marker: render.no_output_marker,
        },
        prelude: "// test unit {{ entry_file }}".to_string(),
        separator_statement: "sep({{ token_json }});".to_string(),
        token: SeparatorToken::with_suffix("test"),
    }
}

/// One scripted response of a [`ScriptedExecutor`].
#[derive(Debug, Clone)]
pub enum ScriptedRun {
    /// Per-segment output, joined with the unit's separator.
    Outputs(Vec<String>),
    /// Stdout returned verbatim.
    Raw(String),
    /// Execution fails with this message.
    Fail(String),
}

impl ScriptedRun {
    pub fn outputs(chunks: &[&str]) -> Self {
        Self::Outputs(chunks.iter().map(|c| c.to_string()).collect())
    }
}

/// Executor replaying queued responses and recording the units it was given.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    runs: RefCell<VecDeque<ScriptedRun>>,
    seen: RefCell<Vec<ExecutionUnit>>,
}

impl ScriptedExecutor {
    pub fn new(runs: Vec<ScriptedRun>) -> Self {
        Self {
            runs: RefCell::new(runs.into()),
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn seen_units(&self) -> Vec<ExecutionUnit> {
        self.seen.borrow().clone()
    }
}

impl CodeExecutor for ScriptedExecutor {
    fn execute(&self, unit: &ExecutionUnit) -> Result<String> {
        self.seen.borrow_mut().push(unit.clone());
        let run = self
            .runs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted run left for {}", unit.logical_name.display()))?;
        match run {
            ScriptedRun::Outputs(chunks) => Ok(join_chunks(&chunks, &unit.token)),
            ScriptedRun::Raw(stdout) => Ok(stdout),
            ScriptedRun::Fail(message) => Err(anyhow!(message)),
        }
    }
}

fn join_chunks(chunks: &[String], token: &SeparatorToken) -> String {
    chunks.join(&format!("\n{token}\n"))
}

/// A call observed by [`RecordingChain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    Snapshot(String),
    Revert(String),
}

/// Chain that records snapshot/revert calls and can be told to fail them.
#[derive(Debug, Default)]
pub struct RecordingChain {
    pub fail_snapshot: bool,
    pub fail_revert: bool,
    pub events: RefCell<Vec<ChainEvent>>,
    pub next_id: Cell<u64>,
}

impl RecordingChain {
    pub fn events(&self) -> Vec<ChainEvent> {
        self.events.borrow().clone()
    }
}

impl ChainState for RecordingChain {
    fn snapshot(&self) -> Result<SnapshotHandle> {
        if self.fail_snapshot {
            bail!("scripted snapshot failure");
        }
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let id = format!("0x{id:x}");
        self.events.borrow_mut().push(ChainEvent::Snapshot(id.clone()));
        Ok(SnapshotHandle::new(id))
    }

    fn revert(&self, handle: SnapshotHandle) -> Result<()> {
        self.events
            .borrow_mut()
            .push(ChainEvent::Revert(handle.id().to_string()));
        if self.fail_revert {
            bail!("scripted revert failure for {}", handle.id());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ToyState {
    balance: i64,
    snapshots: HashMap<String, i64>,
    next_id: u64,
}

/// In-memory chain holding a single balance, with real snapshot semantics:
/// a snapshot can be reverted to exactly once.
#[derive(Debug, Clone, Default)]
pub struct ToyChain {
    state: Rc<RefCell<ToyState>>,
}

impl ToyChain {
    pub fn with_balance(balance: i64) -> Self {
        let chain = Self::default();
        chain.state.borrow_mut().balance = balance;
        chain
    }

    pub fn balance(&self) -> i64 {
        self.state.borrow().balance
    }
}

impl ChainState for ToyChain {
    fn snapshot(&self) -> Result<SnapshotHandle> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = format!("0x{:x}", state.next_id);
        let balance = state.balance;
        state.snapshots.insert(id.clone(), balance);
        Ok(SnapshotHandle::new(id))
    }

    fn revert(&self, handle: SnapshotHandle) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let balance = state
            .snapshots
            .remove(handle.id())
            .ok_or_else(|| anyhow!("unknown snapshot {}", handle.id()))?;
        state.balance = balance;
        Ok(())
    }
}

/// Executor interpreting a tiny language against a [`ToyChain`]:
/// `transfer <n>` debits the balance, `print balance` prints it and
/// `crash` fails the run. Other lines are ignored.
#[derive(Debug, Clone)]
pub struct ToyExecutor {
    chain: ToyChain,
}

impl ToyExecutor {
    pub fn new(chain: &ToyChain) -> Self {
        Self {
            chain: chain.clone(),
        }
    }
}

impl CodeExecutor for ToyExecutor {
    fn execute(&self, unit: &ExecutionUnit) -> Result<String> {
        let mut chunks = Vec::new();
        for segment in &unit.segments {
            let mut printed = Vec::new();
            for line in segment.lines().map(str::trim) {
                if let Some(amount) = line.strip_prefix("transfer ") {
                    let amount: i64 = amount.trim().parse().context("parse transfer amount")?;
                    self.chain.state.borrow_mut().balance -= amount;
                } else if line == "print balance" {
                    printed.push(format!("balance: {}", self.chain.balance()));
                } else if line == "crash" {
                    bail!("toy program crashed in {}", unit.logical_name.display());
                }
            }
            chunks.push(printed.join("\n"));
        }
        Ok(join_chunks(&chunks, &unit.token))
    }
}
