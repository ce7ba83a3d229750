use std::io::Cursor;

use ::csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use super::{Diagnostic, Parser, RowResult, Rows, SourceRow};
use crate::constants::{CSV_DELIMITER_CANDIDATES, CSV_SNIFF_MAX_BYTES, CSV_SNIFF_MAX_LINES};
use crate::metrics::ParserMetrics;
use crate::pipeline::processing::normalize::FlatFieldMap;

/// Delimited text with a header row
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for CsvParser {
    fn name(&self) -> &'static str {
        "CsvParser"
    }

    fn rows(&self, content: Vec<u8>, source_url: &str) -> Result<Rows, Diagnostic> {
        debug!("CsvParser: start bytes_len={}", content.len());
        let text = decode_text(content, source_url);

        let delimiter = match sniff_delimiter(&text) {
            Some(delimiter) => delimiter,
            None => {
                debug!("CsvParser: delimiter not detected, using comma for {}", source_url);
                b','
            }
        };
        debug!("CsvParser: delimiter={:?}", delimiter as char);

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(Cursor::new(text.into_bytes()));

        let headers = reader
            .headers()
            .map_err(|e| Diagnostic::parse_failure(source_url, e))?
            .clone();

        let source_url = source_url.to_string();
        let rows = reader
            .into_records()
            .enumerate()
            .map(move |(index, result)| -> RowResult {
                match result {
                    Ok(record) => Ok(SourceRow {
                        index,
                        fields: flatten_row(&headers, &record),
                    }),
                    Err(e) => Err(Diagnostic::MalformedRow {
                        source_url: source_url.clone(),
                        row: index,
                        reason: e.to_string(),
                    }),
                }
            });
        Ok(Box::new(rows))
    }
}

/// Decode as UTF-8, falling back to Windows-1251 with lossy substitution.
fn decode_text(content: Vec<u8>, source_url: &str) -> String {
    match String::from_utf8(content) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "CsvParser: content of {} is not valid UTF-8 ({}); decoding as windows-1251",
                source_url,
                e.utf8_error()
            );
            ParserMetrics::record_legacy_decode();
            let bytes = e.into_bytes();
            let (text, had_errors) = encoding_rs::WINDOWS_1251.decode_without_bom_handling(&bytes);
            if had_errors {
                debug!("CsvParser: replacement characters substituted for {}", source_url);
            }
            text.into_owned()
        }
    }
}

/// Pair a data row with the header. Missing trailing cells become empty strings;
/// cells beyond the header have no key and are ignored.
fn flatten_row(headers: &StringRecord, record: &StringRecord) -> FlatFieldMap {
    FlatFieldMap::from_pairs(
        headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header, record.get(i).unwrap_or(""))),
    )
}

/// Guess the delimiter from the leading lines of the text.
///
/// Each candidate is scored by how often and how consistently it occurs per line
/// (quoted sections ignored). Returns `None` when no candidate occurs at all.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let mut sample = Vec::new();
    let mut sampled_bytes = 0usize;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        if !sample.is_empty() && sampled_bytes + line.len() > CSV_SNIFF_MAX_BYTES {
            break;
        }
        sampled_bytes += line.len();
        sample.push(line);
        if sample.len() >= CSV_SNIFF_MAX_LINES {
            break;
        }
    }
    if sample.is_empty() {
        return None;
    }

    let mut best: Option<(u8, f32)> = None;
    for &candidate in &CSV_DELIMITER_CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| count_unquoted(line, candidate))
            .collect();
        let avg = counts.iter().sum::<usize>() as f32 / counts.len() as f32;
        if avg == 0.0 {
            continue;
        }
        let variance = counts
            .iter()
            .map(|&c| (c as f32 - avg).powi(2))
            .sum::<f32>()
            / counts.len() as f32;
        let score = avg / (1.0 + variance.sqrt());

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    best.map(|(delimiter, _)| delimiter)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}
