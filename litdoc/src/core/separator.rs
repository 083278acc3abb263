//! Separator token printed between executed code segments.
//!
//! The token is a multi-line sentinel with a random suffix chosen once per
//! run. Realignment assumes sample code never prints it; the suffix makes an
//! accidental collision unlikely but not impossible.

use rand::Rng;

const FENCE: &str = "=====";

/// Sentinel separating the output of consecutive code segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatorToken(String);

impl SeparatorToken {
    /// Token with a fresh random suffix.
    pub fn random() -> Self {
        let suffix: u64 = rand::thread_rng().r#gen();
        Self::with_suffix(&format!("{suffix:016x}"))
    }

    /// Token with a fixed suffix (deterministic, for tests and reproducible runs).
    pub fn with_suffix(suffix: &str) -> Self {
        Self(format!("{FENCE}\n{FENCE}litdoc-{suffix}{FENCE}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The token as a double-quoted JSON string literal, also valid in JS/TS.
    pub fn json_literal(&self) -> String {
        serde_json::Value::String(self.0.clone()).to_string()
    }
}

impl std::fmt::Display for SeparatorToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
