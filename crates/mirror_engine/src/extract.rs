use ego_tree::NodeRef;
use mirror_core::{Row, RowSet};
use mirror_logging::{mirror_debug, mirror_warn};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::DecodeError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid table selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("page could not be decoded: {0}")]
    Decode(#[from] DecodeError),
    #[error("page is empty")]
    EmptyDocument,
    #[error("page does not contain any markup")]
    NotMarkup,
    #[error("no two-cell rows found in the target table")]
    NoRows,
}

/// Pulls two-cell rows out of the first table body found in a page.
///
/// Rows with any other number of `td` children are skipped. A first cell
/// that is not an integer degrades the row's code instead of dropping it.
///
/// Only the first table matching the selector that has its own body rows is
/// read, and rows of tables nested inside it are ignored. When the data table
/// sits inside a layout table, the outer table wins and no rows come back;
/// point the selector at the data table instead (e.g. `table#codes` or
/// `td > table`).
#[derive(Debug, Clone)]
pub struct TableExtractor {
    selector_text: String,
    table: Selector,
}

impl TableExtractor {
    pub fn new(table_selector: &str) -> Result<Self, ParseError> {
        let table =
            Selector::parse(table_selector).map_err(|err| ParseError::InvalidSelector {
                selector: table_selector.to_string(),
                message: err.to_string(),
            })?;
        Ok(Self {
            selector_text: table_selector.to_string(),
            table,
        })
    }

    pub fn selector(&self) -> &str {
        &self.selector_text
    }

    pub fn extract(&self, html: &str) -> Result<RowSet, ParseError> {
        if html.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        if !html.contains('<') {
            return Err(ParseError::NotMarkup);
        }

        let doc = Html::parse_document(html);
        let Some(table) = doc.select(&self.table).find(has_body_rows) else {
            mirror_warn!("No table matching {:?} with body rows found", self.selector_text);
            return Ok(RowSet::new());
        };

        let mut rows = RowSet::new();
        let mut skipped = 0usize;
        for tr in body_rows(table) {
            let cells: Vec<ElementRef<'_>> = child_elements(*tr, "td").collect();
            if cells.len() != 2 {
                skipped += 1;
                continue;
            }
            let row = Row::from_cells(&cell_text(cells[0]), &cell_text(cells[1]));
            if row.is_degraded() {
                mirror_warn!(
                    "Code {:?} is not an integer; publishing it as 0",
                    cell_text(cells[0]).trim()
                );
            }
            rows.push(row);
        }

        mirror_debug!(
            "Extracted {} rows ({} skipped) from table {:?}",
            rows.len(),
            skipped,
            self.selector_text
        );
        Ok(rows)
    }
}

fn has_body_rows(table: &ElementRef<'_>) -> bool {
    body_rows(*table).next().is_some()
}

/// `tr` elements of the table's own `tbody` sections, in document order.
/// Rows of nested tables are not included.
fn body_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    child_elements(*table, "tbody").flat_map(|tbody| child_elements(*tbody, "tr"))
}

fn child_elements<'a>(
    node: NodeRef<'a, Node>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    node.children()
        .filter_map(ElementRef::wrap)
        .filter(move |element| element.value().name() == name)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect()
}
