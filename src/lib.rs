pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod types;

pub use config::Config;
pub use error::{IngestError, Result};
pub use pipeline::processing::enrich::CityBackfill;
pub use pipeline::processing::normalize::FieldMappingTable;
pub use pipeline::{dispatch, BlobReport, Diagnostic, Pipeline, PipelineResult, RecordStream};
pub use types::{CanonicalRecord, DataFormat, Field, RawBlob};
