//! IO module - run files and CSV output.

mod config;
mod trace;

pub use config::{parse_run_config, read_run_config, RunConfig, StructureConfig};
pub use trace::{write_trace, write_trace_file, SnapshotWriter};
