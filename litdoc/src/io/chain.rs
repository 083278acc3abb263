//! Snapshot/revert access to the shared forked chain.
//!
//! The renderer never interprets chain state. It only needs to checkpoint
//! the node before a document runs and roll back afterwards, which local
//! development nodes expose as `evm_snapshot` and `evm_revert`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::{debug, instrument};

/// Opaque point-in-time checkpoint of the chain. Consumed by a revert.
#[derive(Debug, PartialEq, Eq)]
pub struct SnapshotHandle(String);

impl SnapshotHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Checkpoint and rollback operations on the shared external state.
pub trait ChainState {
    fn snapshot(&self) -> Result<SnapshotHandle>;
    fn revert(&self, handle: SnapshotHandle) -> Result<()>;
}

/// Chain used when evaluation is disabled; makes no network calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopChain;

impl ChainState for NoopChain {
    fn snapshot(&self) -> Result<SnapshotHandle> {
        Ok(SnapshotHandle::new("noop"))
    }

    fn revert(&self, _handle: SnapshotHandle) -> Result<()> {
        Ok(())
    }
}

/// JSON-RPC client for a node exposing `evm_snapshot` / `evm_revert`.
#[derive(Debug)]
pub struct JsonRpcChain {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcChain {
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("build rpc client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": id });
        debug!(method, id, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .with_context(|| format!("send {method} to {}", self.url))?;
        let status = response.status();
        let text = response
            .text()
            .with_context(|| format!("read {method} response"))?;
        if !status.is_success() {
            bail!("{method} failed with status {status}: {text}");
        }

        let body: Value = serde_json::from_str(&text)
            .with_context(|| format!("parse {method} response: {text}"))?;
        rpc_result(method, body)
    }
}

impl ChainState for JsonRpcChain {
    #[instrument(skip_all)]
    fn snapshot(&self) -> Result<SnapshotHandle> {
        let result = self.call("evm_snapshot", json!([]))?;
        let handle = parse_snapshot_result(result)?;
        debug!(snapshot = handle.id(), "snapshot taken");
        Ok(handle)
    }

    #[instrument(skip_all, fields(snapshot = handle.id()))]
    fn revert(&self, handle: SnapshotHandle) -> Result<()> {
        let result = self.call("evm_revert", json!([handle.id()]))?;
        parse_revert_result(&handle, result)?;
        debug!("reverted to snapshot");
        Ok(())
    }
}

/// Extract `result` from a JSON-RPC response body, surfacing `error` objects.
fn rpc_result(method: &str, mut body: Value) -> Result<Value> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        bail!("{method} returned rpc error {code:?}: {message}");
    }
    body.get_mut("result")
        .map(Value::take)
        .ok_or_else(|| anyhow!("{method} response has no result"))
}

fn parse_snapshot_result(result: Value) -> Result<SnapshotHandle> {
    match result {
        Value::String(id) if !id.is_empty() => Ok(SnapshotHandle::new(id)),
        Value::Number(n) => Ok(SnapshotHandle::new(n.to_string())),
        other => bail!("unexpected evm_snapshot result {other}"),
    }
}

fn parse_revert_result(handle: &SnapshotHandle, result: Value) -> Result<()> {
    match result {
        Value::Bool(true) => Ok(()),
        Value::Bool(false) => bail!("node rejected revert to snapshot {}", handle.id()),
        other => bail!("unexpected evm_revert result {other}"),
    }
}
