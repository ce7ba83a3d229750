// Pipeline processing: parsing, normalization, validation, and enrichment

pub mod enrich;
pub mod normalize;
pub mod parser;
pub mod quality_gate;
