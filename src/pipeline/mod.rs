//! Processing pipeline components.
//!
//! Stages run strictly in order: framing and log-mel features (in
//! [`crate::audio`]), chunking, one inference request per chunk, and
//! reassembly of the returned embedding batches.

mod assembler;
mod chunker;
mod coordinator;
mod embedder;
mod processor;

pub use assembler::assemble;
pub use chunker::Chunker;
pub use coordinator::{
    ProcessCheck, ProcessOptions, collect_input_files, features_path_for, output_dir_for,
    output_path_for, should_process,
};
pub use embedder::Embedder;
pub use processor::{ProcessResult, process_file};
