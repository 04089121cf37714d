//! Output format writers.

mod csv;
mod json;
pub mod progress;
mod types;
mod writer;

pub use self::csv::CsvWriter;
pub use json::{
    JsonEmbeddingFile, JsonEmbeddingWriter, JsonFeatureFile, JsonSegment, write_features_json,
};
pub use types::{EmbeddingMetadata, EmbeddingSettings, SegmentEmbedding, segments};
pub use writer::OutputWriter;
