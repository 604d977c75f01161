use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use mirror_core::{CellAddress, CellRange};

use crate::{CellValue, RemoteStore, RemoteStoreError, StoreFailureKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ReadCell,
    WriteRange,
    WriteCell,
}

impl StoreOperation {
    fn name(self) -> &'static str {
        match self {
            StoreOperation::ReadCell => "read",
            StoreOperation::WriteRange => "write_range",
            StoreOperation::WriteCell => "write_cell",
        }
    }
}

/// One call observed by an [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ReadCell {
        sheet: String,
        cell: CellAddress,
    },
    WriteRange {
        sheet: String,
        range: CellRange,
        rows: Vec<(CellValue, CellValue)>,
    },
    WriteCell {
        sheet: String,
        cell: CellAddress,
        value: String,
    },
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreCall::ReadCell { .. })
    }
}

#[derive(Default)]
struct Inner {
    cells: BTreeMap<(String, CellAddress), String>,
    calls: Vec<StoreCall>,
    failing: HashSet<StoreOperation>,
    delay: Option<Duration>,
}

/// Process-local [`RemoteStore`] that records every call. Failures and
/// latency can be injected per operation.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presets a cell without recording a call.
    pub fn with_cell(self, sheet: &str, cell: CellAddress, value: impl Into<String>) -> Self {
        self.lock()
            .cells
            .insert((sheet.to_string(), cell), value.into());
        self
    }

    pub fn fail_on(&self, operation: StoreOperation) {
        self.lock().failing.insert(operation);
    }

    pub fn recover(&self, operation: StoreOperation) {
        self.lock().failing.remove(&operation);
    }

    /// Every subsequent call sleeps for `delay` before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    pub fn cell(&self, sheet: &str, cell: CellAddress) -> Option<String> {
        self.lock().cells.get(&(sheet.to_string(), cell)).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn writes(&self) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the recorded calls.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn begin(&self, operation: StoreOperation, call: StoreCall) -> Result<(), RemoteStoreError> {
        let delay = {
            let mut inner = self.lock();
            inner.calls.push(call);
            if inner.failing.contains(&operation) {
                return Err(RemoteStoreError::new(
                    operation.name(),
                    StoreFailureKind::Network,
                    "injected failure",
                ));
            }
            inner.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryStore {
    async fn read_cell(
        &self,
        sheet: &str,
        cell: CellAddress,
    ) -> Result<Option<String>, RemoteStoreError> {
        self.begin(
            StoreOperation::ReadCell,
            StoreCall::ReadCell {
                sheet: sheet.to_string(),
                cell,
            },
        )
        .await?;
        Ok(self.cell(sheet, cell))
    }

    async fn write_range(
        &self,
        sheet: &str,
        range: CellRange,
        rows: &[(CellValue, CellValue)],
    ) -> Result<(), RemoteStoreError> {
        self.begin(
            StoreOperation::WriteRange,
            StoreCall::WriteRange {
                sheet: sheet.to_string(),
                range,
                rows: rows.to_vec(),
            },
        )
        .await?;

        let mut inner = self.lock();
        for (offset, (code, description)) in rows.iter().enumerate() {
            let Some(first) = range.start.offset(0, offset as u32) else {
                break;
            };
            if let Some(second) = first.offset(1, 0) {
                inner
                    .cells
                    .insert((sheet.to_string(), second), description.to_string());
            }
            inner.cells.insert((sheet.to_string(), first), code.to_string());
        }
        Ok(())
    }

    async fn write_cell(
        &self,
        sheet: &str,
        cell: CellAddress,
        value: &str,
    ) -> Result<(), RemoteStoreError> {
        self.begin(
            StoreOperation::WriteCell,
            StoreCall::WriteCell {
                sheet: sheet.to_string(),
                cell,
                value: value.to_string(),
            },
        )
        .await?;
        self.lock()
            .cells
            .insert((sheet.to_string(), cell), value.to_string());
        Ok(())
    }
}
