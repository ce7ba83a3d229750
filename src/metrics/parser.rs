//! Parser phase metrics: blobs parsed, records emitted or dropped, failures.

use crate::types::DataFormat;

/// Metrics collection for the parse/normalize phase
pub struct ParserMetrics;

impl ParserMetrics {
    pub fn record_blob_started(format: DataFormat) {
        ::metrics::counter!("osbb_parser_blobs_total", "format" => format.as_str()).increment(1);
    }

    pub fn record_emitted(format: DataFormat) {
        ::metrics::counter!("osbb_parser_records_emitted_total", "format" => format.as_str())
            .increment(1);
    }

    pub fn record_filtered(format: DataFormat) {
        ::metrics::counter!("osbb_parser_records_filtered_total", "format" => format.as_str())
            .increment(1);
    }

    /// A single row or entry skipped (malformed row, non-object entry)
    pub fn record_skipped(format: DataFormat) {
        ::metrics::counter!("osbb_parser_entries_skipped_total", "format" => format.as_str())
            .increment(1);
    }

    /// A whole blob yielded nothing because it could not be read
    pub fn record_blob_failed(kind: &'static str) {
        ::metrics::counter!("osbb_parser_blob_failures_total", "kind" => kind).increment(1);
    }

    pub fn record_legacy_decode() {
        ::metrics::counter!("osbb_parser_legacy_decodes_total").increment(1);
    }

    pub(crate) fn describe() {
        ::metrics::describe_counter!("osbb_parser_blobs_total", "Blobs dispatched to a parser");
        ::metrics::describe_counter!(
            "osbb_parser_records_emitted_total",
            "Canonical records yielded downstream"
        );
        ::metrics::describe_counter!(
            "osbb_parser_records_filtered_total",
            "Records dropped for lacking both EDRPOU and address"
        );
        ::metrics::describe_counter!(
            "osbb_parser_entries_skipped_total",
            "Rows or entries skipped because they could not be read"
        );
        ::metrics::describe_counter!(
            "osbb_parser_blob_failures_total",
            "Blobs that produced no records because of a blob-level failure"
        );
        ::metrics::describe_counter!(
            "osbb_parser_legacy_decodes_total",
            "CSV blobs decoded with the Windows-1251 fallback"
        );
    }
}
