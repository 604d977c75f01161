use std::fmt::{self, Write};

use sha2::{Digest as _, Sha256};

use crate::RowSet;

/// Lowercase hex SHA-256 of a [`RowSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `stored` is exactly this digest. No normalization is applied.
    pub fn matches(&self, stored: &str) -> bool {
        self.0 == stored
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, rows: &RowSet) -> Digest;
}

/// Feeds each row as `decimal(code)` followed by the description, with no
/// delimiters between fields or rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Fingerprinter;

impl Fingerprinter for Sha256Fingerprinter {
    fn fingerprint(&self, rows: &RowSet) -> Digest {
        let mut hasher = Sha256::new();
        for row in rows {
            hasher.update(row.code_or_default().to_string().as_bytes());
            hasher.update(row.description.as_bytes());
        }
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest.iter() {
            let _ = write!(&mut hex, "{byte:02x}");
        }
        Digest(hex)
    }
}
