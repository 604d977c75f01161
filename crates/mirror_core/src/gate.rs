use thiserror::Error;

use crate::{CellAddress, CellRange, Digest};

/// Number of columns in the published block: code, description.
pub const DATA_COLUMNS: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("digest cell {digest_cell} lies inside the data block starting at {data_anchor}")]
    DigestInsideData {
        data_anchor: CellAddress,
        digest_cell: CellAddress,
    },
}

/// Where rows and the digest are written in the remote sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishLayout {
    data_anchor: CellAddress,
    digest_cell: CellAddress,
}

impl PublishLayout {
    /// The data block grows downward without bound, so the digest cell must
    /// sit outside the two data columns or above the anchor row.
    pub fn new(data_anchor: CellAddress, digest_cell: CellAddress) -> Result<Self, LayoutError> {
        let in_columns = digest_cell.column() >= data_anchor.column()
            && digest_cell.column() < data_anchor.column().saturating_add(DATA_COLUMNS);
        if in_columns && digest_cell.row() >= data_anchor.row() {
            return Err(LayoutError::DigestInsideData {
                data_anchor,
                digest_cell,
            });
        }
        Ok(Self {
            data_anchor,
            digest_cell,
        })
    }

    pub fn data_anchor(&self) -> CellAddress {
        self.data_anchor
    }

    pub fn digest_cell(&self) -> CellAddress {
        self.digest_cell
    }

    /// Range covering `row_count` rows; `None` when there is nothing to write.
    pub fn data_range(&self, row_count: usize) -> Option<CellRange> {
        let height = u32::try_from(row_count).ok()?;
        CellRange::from_anchor(self.data_anchor, DATA_COLUMNS, height)
    }
}

impl Default for PublishLayout {
    /// Rows from `A1`, digest in `C1`.
    fn default() -> Self {
        Self {
            data_anchor: CellAddress::from_parts(1, 1),
            digest_cell: CellAddress::from_parts(3, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Stored digest equals the new one; nothing to write.
    Unchanged,
    /// Content differs or no digest was stored yet.
    Publish { previous: Option<String> },
}

/// Decides whether a freshly computed digest needs publishing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeGate {
    layout: PublishLayout,
}

impl ChangeGate {
    pub fn new(layout: PublishLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PublishLayout {
        &self.layout
    }

    /// False iff a digest is stored and is exactly equal to `new_digest`.
    /// An empty stored value counts as absent.
    pub fn should_publish(&self, new_digest: &Digest, stored: Option<&str>) -> bool {
        match stored {
            Some(stored) if !stored.is_empty() => !new_digest.matches(stored),
            _ => true,
        }
    }

    pub fn decide(&self, new_digest: &Digest, stored: Option<String>) -> GateDecision {
        if self.should_publish(new_digest, stored.as_deref()) {
            GateDecision::Publish {
                previous: stored.filter(|s| !s.is_empty()),
            }
        } else {
            GateDecision::Unchanged
        }
    }
}
