//! CSV output format writer.

use crate::error::Result;
use crate::output::writer::write_error;
use crate::output::{EmbeddingMetadata, OutputWriter, SegmentEmbedding};
use std::fs::File;
use std::path::{Path, PathBuf};

/// CSV format output writer.
///
/// One row per segment: `segment,start_s,end_s,e0,...,eN`.
pub struct CsvWriter {
    writer: csv::Writer<File>,
    output_path: PathBuf,
    record: Vec<String>,
}

impl CsvWriter {
    /// Create a new CSV writer.
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| write_error(path, e))?;
        Ok(Self {
            writer: csv::Writer::from_writer(file),
            output_path: path.to_path_buf(),
            record: Vec::new(),
        })
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self, _metadata: &EmbeddingMetadata, embedding_dim: usize) -> Result<()> {
        let header = ["segment", "start_s", "end_s"]
            .into_iter()
            .map(str::to_string)
            .chain((0..embedding_dim).map(|i| format!("e{i}")));
        self.writer
            .write_record(header)
            .map_err(|e| write_error(&self.output_path, e))
    }

    fn write_segment(&mut self, segment: &SegmentEmbedding<'_>) -> Result<()> {
        self.record.clear();
        self.record.push(segment.index.to_string());
        self.record.push(format!("{:.3}", segment.start_time));
        self.record.push(format!("{:.3}", segment.end_time));
        self.record
            .extend(segment.values.iter().map(ToString::to_string));

        self.writer
            .write_record(&self.record)
            .map_err(|e| write_error(&self.output_path, e))
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| write_error(&self.output_path, e))
    }
}
