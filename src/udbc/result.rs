use crate::udbc::value::Value;

/// Outcome of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Present only when the statement asked for generated keys and the
    /// database produced one.
    pub generated_key: Option<Value>,
}

impl ExecResult {
    pub fn rows(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            generated_key: None,
        }
    }
}

/// Per-entry result of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCount {
    /// The entry succeeded and reported this many affected rows.
    Rows(u64),
    /// The entry succeeded but the driver could not report a row count,
    /// e.g. when it rewrote the batch into one multi-row statement.
    SuccessNoInfo,
}

impl UpdateCount {
    pub fn rows(&self) -> Option<u64> {
        match self {
            UpdateCount::Rows(n) => Some(*n),
            UpdateCount::SuccessNoInfo => None,
        }
    }
}

/// Affected-row count plus the key generated by the statement.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedKey {
    pub rows_affected: u64,
    pub key: Value,
}

impl GeneratedKey {
    pub fn key_as_i64(&self) -> Option<i64> {
        self.key.as_i64()
    }
}
