use std::fmt;

use mirror_core::{CellAddress, CellRange, Row};
use serde::Serialize;
use thiserror::Error;

/// Loosely typed cell content. The store may reinterpret text the way a
/// user typing it would, e.g. numeric text becoming a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(i64),
    Text(String),
}

impl CellValue {
    /// The published pair for one row: code, then description.
    pub fn pair(row: &Row) -> (CellValue, CellValue) {
        (
            CellValue::Number(row.code_or_default()),
            CellValue::Text(row.description.clone()),
        )
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote store {operation} failed ({kind}): {message}")]
pub struct RemoteStoreError {
    pub operation: &'static str,
    pub kind: StoreFailureKind,
    pub message: String,
}

impl RemoteStoreError {
    pub fn new(
        operation: &'static str,
        kind: StoreFailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFailureKind {
    Auth,
    HttpStatus(u16),
    Timeout,
    Cancelled,
    Network,
    MalformedResponse,
}

impl fmt::Display for StoreFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreFailureKind::Auth => write!(f, "authentication rejected"),
            StoreFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            StoreFailureKind::Timeout => write!(f, "timeout"),
            StoreFailureKind::Cancelled => write!(f, "cancelled"),
            StoreFailureKind::Network => write!(f, "network error"),
            StoreFailureKind::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

/// Key-range store holding the published rows and the last digest.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// `None` when the cell has never been written.
    async fn read_cell(
        &self,
        sheet: &str,
        cell: CellAddress,
    ) -> Result<Option<String>, RemoteStoreError>;

    /// Overwrites the rectangular `range` with `rows`, one pair per row.
    async fn write_range(
        &self,
        sheet: &str,
        range: CellRange,
        rows: &[(CellValue, CellValue)],
    ) -> Result<(), RemoteStoreError>;

    async fn write_cell(
        &self,
        sheet: &str,
        cell: CellAddress,
        value: &str,
    ) -> Result<(), RemoteStoreError>;
}
