use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mirror_core::{
    ChangeGate, Digest, Fingerprinter, GateDecision, PublishLayout, RowSet, Sha256Fingerprinter,
};
use mirror_logging::{mirror_debug, mirror_info, mirror_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    decode_html, CellValue, FailureKind, FetchError, PageFetcher, ParseError,
    RemoteStore, RemoteStoreError, StoreFailureKind, TableExtractor,
};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] RemoteStoreError),
    #[error("digest cell changed from {expected:?} to {found:?} during the run; another writer is active")]
    ConcurrentUpdate {
        expected: Option<String>,
        found: Option<String>,
    },
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Unchanged {
        digest: Digest,
        row_count: usize,
    },
    Published {
        digest: Digest,
        previous: Option<String>,
        row_count: usize,
    },
}

/// Guards the read-compare-write sequence against other writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    /// One scheduled writer. Concurrent runs may lose an update.
    #[default]
    SingleWriter,
    /// Re-read the digest cell just before publishing and abort if it moved.
    VerifyBeforePublish,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_url: String,
    pub sheet_name: String,
    pub layout: PublishLayout,
    pub fetch_timeout: Duration,
    pub store_timeout: Duration,
    pub concurrency: ConcurrencyPolicy,
}

/// Fetch, extract, fingerprint, compare and, when the table changed,
/// publish rows followed by the new digest.
///
/// Every stage fails fast. If the row write succeeds and the digest write
/// fails, the stored digest stays stale and the next run publishes again.
pub struct Pipeline {
    settings: PipelineSettings,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn RemoteStore>,
    extractor: TableExtractor,
    fingerprinter: Box<dyn Fingerprinter>,
    gate: ChangeGate,
}

enum Interrupt {
    Timeout,
    Cancelled,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn RemoteStore>,
        extractor: TableExtractor,
    ) -> Self {
        let gate = ChangeGate::new(settings.layout);
        Self {
            settings,
            fetcher,
            store,
            extractor,
            fingerprinter: Box::new(Sha256Fingerprinter),
            gate,
        }
    }

    pub fn with_fingerprinter(mut self, fingerprinter: Box<dyn Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunOutcome, RunError> {
        let rows = self.fetch_rows(cancel).await?;
        let digest = self.fingerprinter.fingerprint(&rows);
        mirror_debug!("Digest of {} rows: {}", rows.len(), digest);

        let stored = self.read_digest(cancel).await?;
        let previous = match self.gate.decide(&digest, stored.clone()) {
            GateDecision::Unchanged => {
                mirror_info!("Table data has not changed since last run.");
                return Ok(RunOutcome::Unchanged {
                    digest,
                    row_count: rows.len(),
                });
            }
            GateDecision::Publish { previous } => previous,
        };
        match &previous {
            Some(old) => mirror_info!("Table data changed (stored digest {old})"),
            None => mirror_info!("No stored digest found; publishing for the first time"),
        }

        if self.settings.concurrency == ConcurrencyPolicy::VerifyBeforePublish {
            let current = self.read_digest(cancel).await?;
            if non_empty(current.as_deref()) != non_empty(stored.as_deref()) {
                return Err(RunError::ConcurrentUpdate {
                    expected: stored,
                    found: current,
                });
            }
        }

        self.publish(&rows, &digest, cancel).await?;
        Ok(RunOutcome::Published {
            digest,
            previous,
            row_count: rows.len(),
        })
    }

    async fn fetch_rows(&self, cancel: &CancellationToken) -> Result<RowSet, RunError> {
        let url = self.settings.source_url.as_str();
        mirror_info!("Fetching {url}");
        let page = bounded(self.settings.fetch_timeout, cancel, self.fetcher.render(url))
            .await
            .map_err(|interrupt| match interrupt {
                Interrupt::Timeout => FetchError::new(
                    FailureKind::Timeout,
                    format!("no page within {:?}", self.settings.fetch_timeout),
                ),
                Interrupt::Cancelled => FetchError::new(FailureKind::Cancelled, "run cancelled"),
            })??;

        let decoded = decode_html(&page.bytes, page.metadata.content_type.as_deref())
            .map_err(ParseError::from)?;
        let rows = self.extractor.extract(&decoded.html)?;
        // A page without rows (login, maintenance) must not replace the stored digest.
        if rows.is_empty() {
            return Err(ParseError::NoRows.into());
        }
        mirror_info!(
            "Extracted {} rows from {} ({} bytes, {})",
            rows.len(),
            page.metadata.final_url,
            page.metadata.byte_len,
            decoded.encoding_label
        );
        let degraded = rows.degraded_count();
        if degraded > 0 {
            mirror_warn!("{degraded} rows have a non-numeric code");
        }
        Ok(rows)
    }

    async fn read_digest(&self, cancel: &CancellationToken) -> Result<Option<String>, RunError> {
        let cell = self.settings.layout.digest_cell();
        let stored = self
            .store_call("read", cancel, self.store.read_cell(&self.settings.sheet_name, cell))
            .await?;
        mirror_debug!("Stored digest at {cell}: {stored:?}");
        Ok(stored)
    }

    async fn publish(
        &self,
        rows: &RowSet,
        digest: &Digest,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        let sheet = self.settings.sheet_name.as_str();
        let range = self
            .settings
            .layout
            .data_range(rows.len())
            .ok_or(ParseError::NoRows)?;
        let values: Vec<(CellValue, CellValue)> = rows.iter().map(CellValue::pair).collect();
        self.store_call(
            "write_range",
            cancel,
            self.store.write_range(sheet, range, &values),
        )
        .await?;
        mirror_info!("Wrote {} rows to {sheet}!{range}", values.len());

        let cell = self.settings.layout.digest_cell();
        self.store_call(
            "write_cell",
            cancel,
            self.store.write_cell(sheet, cell, digest.as_str()),
        )
        .await?;
        mirror_debug!("Wrote digest to {sheet}!{cell}");
        Ok(())
    }

    async fn store_call<T>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        call: impl Future<Output = Result<T, RemoteStoreError>>,
    ) -> Result<T, RunError> {
        let limit = self.settings.store_timeout;
        let result = bounded(limit, cancel, call).await.map_err(|interrupt| match interrupt {
            Interrupt::Timeout => RemoteStoreError::new(
                operation,
                StoreFailureKind::Timeout,
                format!("no answer within {limit:?}"),
            ),
            Interrupt::Cancelled => {
                RemoteStoreError::new(operation, StoreFailureKind::Cancelled, "run cancelled")
            }
        })?;
        Ok(result?)
    }
}

async fn bounded<T>(
    limit: Duration,
    cancel: &CancellationToken,
    work: impl Future<Output = T>,
) -> Result<T, Interrupt> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        result = tokio::time::timeout(limit, work) => result.map_err(|_| Interrupt::Timeout),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
