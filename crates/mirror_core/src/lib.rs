//! Table mirror core: row model, fingerprinting and the change gate.
mod cell;
mod fingerprint;
mod gate;
mod row;

pub use cell::{CellAddress, CellAddressError, CellRange};
pub use fingerprint::{Digest, Fingerprinter, Sha256Fingerprinter};
pub use gate::{ChangeGate, GateDecision, LayoutError, PublishLayout, DATA_COLUMNS};
pub use row::{Row, RowSet};
