//! Where decoded records go.

use serde::Serialize;

use crate::cancellation::CancellationToken;
use crate::events::{Event, EventKind};
use crate::object_cache::FastMap;

/// Per-row information handed to a [`RecordSink`] alongside the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsingContext {
    /// Path (or buffer name) of the source being parsed.
    pub source_name: String,
    /// Schema name of the current table.
    pub table: Option<String>,
    /// Index of the row inside its table.
    pub row_index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingResult {
    Processed,
    Ignored,
}

pub trait RecordSink {
    fn process_record(
        &mut self,
        event: Event,
        context: &ParsingContext,
        cancellation: &CancellationToken,
    ) -> ProcessingResult;
}

impl<F> RecordSink for F
where
    F: FnMut(Event, &ParsingContext, &CancellationToken) -> ProcessingResult,
{
    fn process_record(
        &mut self,
        event: Event,
        context: &ParsingContext,
        cancellation: &CancellationToken,
    ) -> ProcessingResult {
        self(event, context, cancellation)
    }
}

/// Collects records grouped by kind, keeping each group in arrival order.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: FastMap<EventKind, Vec<Event>>,
    accepted: Option<Vec<EventKind>>,
}

impl EventCollector {
    pub fn new() -> Self {
        EventCollector::default()
    }

    /// Only keep records of the given kinds; everything else is reported as ignored.
    pub fn with_kinds(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        EventCollector {
            events: FastMap::default(),
            accepted: Some(kinds.into_iter().collect()),
        }
    }

    pub fn accepts(&self, kind: EventKind) -> bool {
        self.accepted
            .as_ref()
            .is_none_or(|accepted| accepted.contains(&kind))
    }

    pub fn events(&self, kind: EventKind) -> &[Event] {
        self.events.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_events(self) -> FastMap<EventKind, Vec<Event>> {
        self.events
    }
}

impl RecordSink for EventCollector {
    fn process_record(
        &mut self,
        event: Event,
        _context: &ParsingContext,
        _cancellation: &CancellationToken,
    ) -> ProcessingResult {
        let kind = event.kind();
        if !self.accepts(kind) {
            return ProcessingResult::Ignored;
        }

        self.events.entry(kind).or_default().push(event);
        ProcessingResult::Processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PotentialHang, SyscallNameMap};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collector_groups_by_kind_and_filters() {
        let context = ParsingContext::default();
        let token = CancellationToken::new();
        let mut collector = EventCollector::with_kinds([EventKind::PotentialHang]);

        assert_eq!(
            collector.process_record(PotentialHang::default().into(), &context, &token),
            ProcessingResult::Processed
        );
        assert_eq!(
            collector.process_record(SyscallNameMap::default().into(), &context, &token),
            ProcessingResult::Ignored
        );

        assert_eq!(collector.len(), 1);
        assert_eq!(collector.events(EventKind::PotentialHang).len(), 1);
        assert!(collector.events(EventKind::SyscallNameMap).is_empty());
    }
}
