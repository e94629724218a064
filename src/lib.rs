#![deny(unused_must_use)]
#![forbid(unsafe_code)]
//! A streaming decoder for `xctrace export` captures.
//!
//! `xctrace export` writes one XML document per exported table, back to back, into a single
//! file. [`TraceParser`] stitches those fragments into one logical document without buffering
//! the file, reads each table's inline schema, and decodes every row of a known table into a
//! typed [`Event`], resolving the `id`/`ref` object graph along the way.

pub mod cancellation;
pub mod deserializer;
pub mod err;
pub mod events;
pub mod model;
pub mod object_cache;
pub mod row_decoder;
pub mod schema;
pub mod sink;
pub mod streams;
pub mod trace_parser;

pub use cancellation::CancellationToken;
pub use events::{Event, EventKind, EventShape};
pub use row_decoder::{RowDecoder, ShapeRegistry};
pub use schema::{Column, Schema};
pub use sink::{EventCollector, ParsingContext, ProcessingResult, RecordSink};
pub use streams::{CompositeReader, FilterReader, NoProgress, ProgressReader, ProgressSink};
pub use trace_parser::{
    DocumentBounds, ParseOutcome, ParseSummary, ParserSettings, TraceParser, TraceSource,
    XML_DECLARATION,
};

// For tests, we only initialize logging once.
#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
