//! Per-document isolation on the shared chain.
//!
//! Every document runs between a snapshot and a revert so its on-chain side
//! effects never reach the next document. The revert happens whether the
//! body succeeded, failed or panicked.

use anyhow::Result;
use tracing::{error, instrument, warn};

use crate::io::chain::{ChainState, SnapshotHandle};

/// Scoped snapshot: reverted by [`SnapshotGuard::release`], or on drop if
/// never released.
pub struct SnapshotGuard<'a, C: ChainState + ?Sized> {
    chain: &'a C,
    handle: Option<SnapshotHandle>,
}

impl<'a, C: ChainState + ?Sized> SnapshotGuard<'a, C> {
    pub fn acquire(chain: &'a C) -> Result<Self> {
        let handle = chain.snapshot()?;
        Ok(Self {
            chain,
            handle: Some(handle),
        })
    }

    /// Revert to the snapshot, reporting failure to the caller.
    pub fn release(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => self.chain.revert(handle),
            None => Ok(()),
        }
    }
}

impl<C: ChainState + ?Sized> Drop for SnapshotGuard<'_, C> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            warn!(snapshot = handle.id(), "snapshot guard dropped without release, reverting");
            if let Err(err) = self.chain.revert(handle) {
                error!(err = %format!("{err:#}"), "REVERT FAILED: chain state is now unknown");
            }
        }
    }
}

/// How an isolated body ended.
#[derive(Debug)]
pub enum Isolated<T> {
    /// The body ran and the chain was reverted.
    Ran(Result<T>),
    /// No snapshot could be taken; the body did not run and the chain is untouched.
    NotStarted(anyhow::Error),
    /// The body ran but the revert failed; chain state is unknown.
    StateLost {
        body: Result<T>,
        error: anyhow::Error,
    },
}

/// Run `body` between a snapshot and a revert of `chain`.
#[instrument(skip_all)]
pub fn run_isolated<C, T, F>(chain: &C, body: F) -> Isolated<T>
where
    C: ChainState + ?Sized,
    F: FnOnce() -> Result<T>,
{
    let guard = match SnapshotGuard::acquire(chain) {
        Ok(guard) => guard,
        Err(err) => {
            error!(err = %format!("{err:#}"), "snapshot failed, skipping document");
            return Isolated::NotStarted(err);
        }
    };

    let result = body();

    match guard.release() {
        Ok(()) => Isolated::Ran(result),
        Err(err) => {
            error!(err = %format!("{err:#}"), "REVERT FAILED: chain state is now unknown");
            Isolated::StateLost {
                body: result,
                error: err,
            }
        }
    }
}
