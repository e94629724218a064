//! Data models decoded out of table rows.
//!
//! Every model implements [`TraceObject`](crate::deserializer::TraceObject), so it can be
//! decoded from a column (or nested position) and shared through the per-table identity cache.

pub mod counters;
pub mod node;
pub mod process;
pub mod symbols;
pub mod values;

pub use self::counters::PmcEvents;
pub use self::node::XmlNode;
pub use self::process::{Process, Thread};
pub use self::symbols::{Backtrace, Frame, Function, Module};
pub use self::values::{Boolean, Integer, Text, Timestamp, TimestampDelta, UInt64};
