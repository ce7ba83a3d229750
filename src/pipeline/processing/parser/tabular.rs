use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use tracing::debug;

use super::{Diagnostic, Parser, RowResult, Rows, SourceRow};
use crate::error::IngestError;
use crate::pipeline::processing::normalize::FlatFieldMap;

/// Excel workbooks (xls, xlsx; ods is detected too). Reads the first worksheet,
/// whose first row is the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularParser;

impl TabularParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for TabularParser {
    fn name(&self) -> &'static str {
        "TabularParser"
    }

    fn rows(&self, content: Vec<u8>, source_url: &str) -> Result<Rows, Diagnostic> {
        debug!("TabularParser: start bytes_len={}", content.len());
        let range = first_sheet(content).map_err(|e| Diagnostic::parse_failure(source_url, e))?;
        debug!(
            "TabularParser: sheet height={} width={} for {}",
            range.height(),
            range.width(),
            source_url
        );
        Ok(Box::new(SheetRows::new(range)))
    }
}

fn first_sheet(content: Vec<u8>) -> Result<Range<Data>, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::EmptyWorkbook)??;
    Ok(range)
}

/// Iterates the data rows of a sheet, pairing each cell with the header cell above it
struct SheetRows {
    range: Range<Data>,
    headers: Vec<String>,
    next_row: usize,
}

impl SheetRows {
    fn new(range: Range<Data>) -> Self {
        let headers = (0..range.width())
            .map(|col| cell_text(range.get((0, col))))
            .collect();
        Self {
            range,
            headers,
            next_row: 1,
        }
    }
}

impl Iterator for SheetRows {
    type Item = RowResult;

    fn next(&mut self) -> Option<RowResult> {
        while self.next_row < self.range.height() {
            let row = self.next_row;
            self.next_row += 1;

            let cells: Vec<String> = (0..self.headers.len())
                .map(|col| cell_text(self.range.get((row, col))))
                .collect();
            if cells.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            return Some(Ok(SourceRow {
                index: row - 1,
                fields: FlatFieldMap::from_pairs(self.headers.iter().zip(cells.iter())),
            }));
        }
        None
    }
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_workbook_is_parse_failure() {
        let err = TabularParser::new()
            .rows(b"definitely not a spreadsheet".to_vec(), "https://portal/x.xlsx")
            .err()
            .unwrap();
        match err {
            Diagnostic::ParseFailure { source_url, reason } => {
                assert_eq!(source_url, "https://portal/x.xlsx");
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected diagnostic {:?}", other),
        }
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&Data::Empty)), "");
        assert_eq!(cell_text(Some(&Data::String("ОСББ".to_string()))), "ОСББ");
        assert_eq!(cell_text(Some(&Data::Float(12345678.0))), "12345678");
        assert_eq!(cell_text(Some(&Data::Int(42))), "42");
    }
}
