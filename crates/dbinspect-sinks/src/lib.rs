//! Result sinks for dbinspect
//!
//! Each sink implements [`ResultSink`](dbinspect_core::ResultSink) and
//! receives the aggregated records once, after every server task has
//! finished.

mod csv_sink;
mod json_sink;
mod sqlite_sink;

pub use csv_sink::CsvSink;
pub use json_sink::JsonSink;
pub use sqlite_sink::SqliteSink;
