/// One record extracted from a two-cell table row.
///
/// `code` is `None` when the first cell did not hold an integer. The row is
/// still kept; only the code is degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub code: Option<i64>,
    pub description: String,
}

impl Row {
    pub fn new(code: i64, description: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            description: description.into(),
        }
    }

    /// Builds a row from the raw text of its two cells.
    pub fn from_cells(code_text: &str, description: &str) -> Self {
        Self {
            code: code_text.trim().parse().ok(),
            description: description.trim().to_string(),
        }
    }

    /// The code as published and fingerprinted; an unparsed code counts as zero.
    pub fn code_or_default(&self) -> i64 {
        self.code.unwrap_or_default()
    }

    pub fn is_degraded(&self) -> bool {
        self.code.is_none()
    }
}

/// Rows in document order. Order is part of the content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn as_slice(&self) -> &[Row] {
        &self.rows
    }

    pub fn degraded_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_degraded()).count()
    }
}

impl From<Vec<Row>> for RowSet {
    fn from(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

impl FromIterator<Row> for RowSet {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
