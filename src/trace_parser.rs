use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, trace, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use serde::Serialize;

use crate::cancellation::CancellationToken;
use crate::deserializer::Deserializer;
use crate::err::{Result, TraceError};
use crate::model::XmlNode;
use crate::model::node::{decode_name, read_event};
use crate::object_cache::ObjectCache;
use crate::row_decoder::{RowDecoder, ShapeRegistry};
use crate::schema::Schema;
use crate::sink::{ParsingContext, ProcessingResult, RecordSink};
use crate::streams::{CompositeReader, FilterReader, ProgressReader, ProgressSink};

/// Every fragment written by `xctrace export` starts with this declaration.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0"?>"#;

const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    /// Byte sequences removed from the input before it reaches the XML reader.
    markers: Vec<Vec<u8>>,
    /// Columns (by element name or engineering type) whose children may define objects.
    rescan_engineering_types: Vec<String>,
    /// Types that decode to nothing, instead of failing, when they have too few children.
    empty_aggregates: Vec<String>,
    /// Names of the hardware counters in `pmc-events` values, in column order.
    counter_names: Vec<String>,
    read_buffer_size: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            markers: vec![XML_DECLARATION.as_bytes().to_vec()],
            rescan_engineering_types: vec!["narrative".to_owned(), "formatted-label".to_owned()],
            empty_aggregates: vec!["frame".to_owned(), "thread".to_owned()],
            counter_names: vec![],
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

fn owned_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    /// Replaces the set of byte sequences elided from the input.
    pub fn markers<I, M>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Vec<u8>>,
    {
        self.markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn rescan_engineering_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rescan_engineering_types = owned_strings(types);
        self
    }

    pub fn empty_aggregates<I, S>(mut self, type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.empty_aggregates = owned_strings(type_names);
        self
    }

    pub fn counter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.counter_names = owned_strings(names);
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    pub fn get_markers(&self) -> &[Vec<u8>] {
        &self.markers
    }

    pub fn get_rescan_engineering_types(&self) -> &[String] {
        &self.rescan_engineering_types
    }

    pub fn get_empty_aggregates(&self) -> &[String] {
        &self.empty_aggregates
    }

    pub fn get_counter_names(&self) -> &[String] {
        &self.counter_names
    }

    pub fn get_read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn should_rescan(&self, tag: &str) -> bool {
        self.rescan_engineering_types.iter().any(|t| t == tag)
    }

    pub fn allows_empty_aggregate(&self, type_name: &str) -> bool {
        self.empty_aggregates.iter().any(|t| t == type_name)
    }
}

/// An input in the concatenated-fragment format.
#[derive(Debug, Clone)]
pub enum TraceSource {
    Path(PathBuf),
    Buffer { name: String, data: Arc<[u8]> },
}

impl TraceSource {
    pub fn name(&self) -> String {
        match self {
            TraceSource::Path(path) => path.display().to_string(),
            TraceSource::Buffer { name, .. } => name.clone(),
        }
    }

    /// Opens the source, returning a reader and its length in bytes.
    fn open(&self) -> Result<(Box<dyn Read + '_>, u64)> {
        match self {
            TraceSource::Path(path) => {
                let failed = |source| TraceError::FailedToOpenFile {
                    path: path.clone(),
                    source,
                };

                let file = File::open(path).map_err(failed)?;
                let len = file.metadata().map_err(failed)?.len();

                Ok((Box::new(file), len))
            }
            TraceSource::Buffer { data, .. } => Ok((Box::new(&data[..]), data.len() as u64)),
        }
    }
}

/// Time range covered by the decoded records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentBounds {
    pub first_timestamp_ns: i64,
    pub last_timestamp_ns: i64,
    /// Taken when parsing finished; exports carry no absolute time.
    pub wall_clock: jiff::Timestamp,
}

#[derive(Debug, Default, Clone, Copy)]
struct TimestampBounds {
    first: Option<i64>,
    last: Option<i64>,
}

impl TimestampBounds {
    fn observe(&mut self, timestamp: i64) {
        self.first = Some(self.first.map_or(timestamp, |first| first.min(timestamp)));
        self.last = Some(self.last.map_or(timestamp, |last| last.max(timestamp)));
    }

    fn finish(self) -> DocumentBounds {
        let first_timestamp_ns = self.first.unwrap_or(0);

        DocumentBounds {
            first_timestamp_ns,
            last_timestamp_ns: self.last.unwrap_or(first_timestamp_ns + 1),
            wall_clock: jiff::Timestamp::now(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    pub tables_decoded: u64,
    /// Tables without a schema, or whose schema no registered shape is compatible with.
    pub tables_skipped: u64,
    /// Every record handed to the sink.
    pub records_emitted: u64,
    /// Records the sink reported as [`ProcessingResult::Ignored`].
    pub records_ignored: u64,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseOutcome {
    pub bounds: DocumentBounds,
    pub summary: ParseSummary,
}

enum TableState<'r> {
    AwaitingSchema,
    Skipping,
    DecodingRows {
        schema: Schema,
        decoder: &'r dyn RowDecoder,
    },
}

/// One `<node>` of a `<trace-query-result>`. Ids are scoped to it.
struct Table<'r> {
    cache: ObjectCache,
    state: TableState<'r>,
    rows: u64,
}

impl Table<'_> {
    fn new() -> Self {
        Table {
            cache: ObjectCache::new(),
            state: TableState::AwaitingSchema,
            rows: 0,
        }
    }
}

/// Decodes `xctrace export` captures into [`Event`](crate::Event)s.
///
/// ```no_run
/// use xctrace::{CancellationToken, EventCollector, NoProgress, ParserSettings, TraceParser};
///
/// let parser = TraceParser::from_path("capture.xml")?
///     .with_configuration(ParserSettings::new().counter_names(["CYCLES"]));
///
/// let mut collector = EventCollector::new();
/// let outcome = parser.process(&mut collector, NoProgress, &CancellationToken::new())?;
///
/// println!("{} records", outcome.summary.records_emitted);
/// # Ok::<(), xctrace::err::TraceError>(())
/// ```
pub struct TraceParser {
    sources: Vec<TraceSource>,
    config: Arc<ParserSettings>,
    registry: Arc<ShapeRegistry>,
}

impl fmt::Debug for TraceParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceParser")
            .field("sources", &self.sources)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

impl TraceParser {
    fn from_sources(sources: Vec<TraceSource>) -> Self {
        TraceParser {
            sources,
            config: Arc::new(ParserSettings::default()),
            registry: Arc::new(ShapeRegistry::default()),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        TraceParser::from_paths([path])
    }

    /// Sources are processed in the given order.
    pub fn from_paths<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let sources = paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref();
                fs::metadata(path).map_err(|source| TraceError::FailedToOpenFile {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(TraceSource::Path(path.to_path_buf()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TraceParser::from_sources(sources))
    }

    pub fn from_buffer(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        TraceParser::from_sources(vec![TraceSource::Buffer {
            name: name.into(),
            data: data.into(),
        }])
    }

    pub fn add_source(mut self, source: TraceSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_configuration(mut self, configuration: ParserSettings) -> Self {
        self.config = Arc::new(configuration);
        self
    }

    pub fn with_registry(mut self, registry: ShapeRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn sources(&self) -> &[TraceSource] {
        &self.sources
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.config
    }

    /// Decodes every source in order, handing each record to `sink` as soon as it is decoded.
    ///
    /// Progress is reported per source. A structural or I/O error aborts processing; records
    /// already handed to `sink` stand. Cancellation is checked before every row.
    pub fn process<S, P>(
        &self,
        sink: &mut S,
        mut progress: P,
        cancellation: &CancellationToken,
    ) -> Result<ParseOutcome>
    where
        S: RecordSink + ?Sized,
        P: ProgressSink,
    {
        let mut bounds = TimestampBounds::default();
        let mut summary = ParseSummary::default();

        for source in &self.sources {
            if cancellation.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let source_name = source.name();
            info!("Parsing `{}`", source_name);

            self.process_source(
                source,
                &source_name,
                sink,
                &mut progress,
                cancellation,
                &mut bounds,
                &mut summary,
            )
            .map_err(|e| TraceError::FailedToParseSource {
                source_name: source_name.clone(),
                source: Box::new(e),
            })?;

            if summary.cancelled {
                break;
            }
        }

        info!(
            "Decoded {} records from {} tables ({} skipped)",
            summary.records_emitted, summary.tables_decoded, summary.tables_skipped
        );

        Ok(ParseOutcome {
            bounds: bounds.finish(),
            summary,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn process_source<S, P>(
        &self,
        source: &TraceSource,
        source_name: &str,
        sink: &mut S,
        progress: &mut P,
        cancellation: &CancellationToken,
        bounds: &mut TimestampBounds,
        summary: &mut ParseSummary,
    ) -> Result<()>
    where
        S: RecordSink + ?Sized,
        P: ProgressSink,
    {
        let (reader, len) = source.open()?;
        let sources: Vec<Box<dyn Read + '_>> = vec![
            Box::new(&b"<root>"[..]),
            Box::new(ProgressReader::new(reader, len, |percent: u8| {
                progress.report(percent)
            })),
            Box::new(&b"</root>"[..]),
        ];

        let filtered = FilterReader::new(
            CompositeReader::new(sources),
            self.config.get_markers().iter().cloned(),
        );

        let mut reader = Reader::from_reader(BufReader::with_capacity(
            self.config.get_read_buffer_size(),
            filtered,
        ));
        reader.config_mut().trim_text(true);

        let mut context = ParsingContext {
            source_name: source_name.to_owned(),
            ..ParsingContext::default()
        };

        DocumentWalker {
            config: &self.config,
            registry: &self.registry,
            sink,
            cancellation,
            bounds,
            summary,
            context: &mut context,
        }
        .walk(&mut reader)
    }
}

/// Walks one document forward, decoding the rows of every compatible table.
struct DocumentWalker<'a, S: ?Sized> {
    config: &'a ParserSettings,
    registry: &'a ShapeRegistry,
    sink: &'a mut S,
    cancellation: &'a CancellationToken,
    bounds: &'a mut TimestampBounds,
    summary: &'a mut ParseSummary,
    context: &'a mut ParsingContext,
}

impl<'a, S: RecordSink + ?Sized> DocumentWalker<'a, S> {
    fn walk<R: BufRead>(mut self, reader: &mut Reader<R>) -> Result<()> {
        let mut buf = Vec::new();
        let mut scratch = Vec::new();
        let mut open: Vec<String> = Vec::new();
        let mut table: Option<Table<'a>> = None;

        loop {
            buf.clear();
            match read_event(reader, &mut buf)? {
                XmlEvent::Start(start) => {
                    let name = decode_name(start.name().as_ref()).into_owned();

                    if let Some(current) = table.as_mut() {
                        self.table_child(reader, current, &start, false, &mut scratch)?;
                        if self.summary.cancelled {
                            return Ok(());
                        }
                        continue;
                    }

                    match (open.last().map(String::as_str), name.as_str()) {
                        (None, "root") | (Some("root"), "trace-query-result") => open.push(name),
                        (Some("trace-query-result"), "node") => {
                            trace!("Table starts at byte {}", reader.buffer_position());
                            table = Some(Table::new());
                        }
                        _ => {
                            debug!("Skipping <{}>", name);
                            reader
                                .read_to_end_into(start.name(), &mut scratch)
                                .map_err(|e| TraceError::xml(reader.buffer_position(), e))?;
                        }
                    }
                }
                XmlEvent::Empty(start) => {
                    if let Some(current) = table.as_mut() {
                        self.table_child(reader, current, &start, true, &mut scratch)?;
                        if self.summary.cancelled {
                            return Ok(());
                        }
                    } else if open.last().map(String::as_str) == Some("trace-query-result")
                        && start.name().as_ref() == b"node"
                    {
                        trace!("Empty table at byte {}", reader.buffer_position());
                        self.finish_table(Table::new());
                    }
                }
                XmlEvent::End(_) => {
                    if let Some(finished) = table.take() {
                        self.finish_table(finished);
                    } else {
                        open.pop();
                    }
                }
                XmlEvent::Eof => {
                    return match (table.is_some(), open.last()) {
                        (true, _) => Err(TraceError::UnexpectedEof {
                            element: "node".to_owned(),
                        }),
                        (false, Some(element)) => Err(TraceError::UnexpectedEof {
                            element: element.clone(),
                        }),
                        (false, None) => Ok(()),
                    };
                }
                _ => {}
            }
        }
    }

    /// Handles an element directly inside a table `<node>`.
    fn table_child<R: BufRead>(
        &mut self,
        reader: &mut Reader<R>,
        table: &mut Table<'a>,
        start: &BytesStart<'_>,
        empty: bool,
        scratch: &mut Vec<u8>,
    ) -> Result<()> {
        let position = reader.buffer_position();
        let name = start.name();

        let materialize = |reader: &mut Reader<R>, scratch: &mut Vec<u8>| -> Result<XmlNode> {
            let node = XmlNode::from_start(start, position)?;
            if empty {
                Ok(node)
            } else {
                node.read_children(reader, scratch)
            }
        };

        let awaiting_schema = matches!(table.state, TableState::AwaitingSchema);
        let decoding_rows = matches!(table.state, TableState::DecodingRows { .. });

        match name.as_ref() {
            b"schema" if awaiting_schema => {
                let schema = Schema::from_node(&materialize(reader, scratch)?)?;
                table.state = self.select_decoder(schema);
            }
            b"row" if decoding_rows => {
                if self.cancellation.is_cancelled() {
                    info!("Cancelled before row {} of `{}`", table.rows, self.table_name());
                    self.summary.cancelled = true;
                    return Ok(());
                }

                let row = materialize(reader, scratch)?;
                self.decode_row(table, &row)?;
            }
            _ if awaiting_schema => {
                warn!(
                    "Table at byte {} does not start with a schema, skipping it",
                    position
                );
                table.state = TableState::Skipping;
                self.skip(reader, start, empty, scratch)?;
            }
            _ => self.skip(reader, start, empty, scratch)?,
        }

        Ok(())
    }

    fn skip<R: BufRead>(
        &self,
        reader: &mut Reader<R>,
        start: &BytesStart<'_>,
        empty: bool,
        scratch: &mut Vec<u8>,
    ) -> Result<()> {
        if !empty {
            reader
                .read_to_end_into(start.name(), scratch)
                .map_err(|e| TraceError::xml(reader.buffer_position(), e))?;
        }
        Ok(())
    }

    fn select_decoder(&mut self, schema: Schema) -> TableState<'a> {
        self.context.table = schema.name.clone();
        self.context.row_index = 0;

        match self.registry.select(&schema) {
            Some(decoder) => {
                debug!(
                    "Decoding table `{}` ({} columns) as {}",
                    schema.display_name(),
                    schema.len(),
                    decoder.kind()
                );
                TableState::DecodingRows { schema, decoder }
            }
            None => {
                debug!(
                    "No record shape is compatible with table `{}`, skipping it",
                    schema.display_name()
                );
                TableState::Skipping
            }
        }
    }

    fn decode_row(&mut self, table: &mut Table<'a>, row: &XmlNode) -> Result<()> {
        let TableState::DecodingRows { schema, decoder } = &table.state else {
            return Ok(());
        };

        let mut de = Deserializer::new(&mut table.cache, self.config);
        let event = decoder.decode_row(row, schema, &mut de)?;

        if let Some(timestamp) = event.timestamp() {
            self.bounds.observe(timestamp);
        }

        self.context.row_index = table.rows;
        table.rows += 1;
        self.summary.records_emitted += 1;

        trace!("Row {} of `{}`: {}", table.rows, self.table_name(), event.kind());

        if self
            .sink
            .process_record(event, self.context, self.cancellation)
            == ProcessingResult::Ignored
        {
            self.summary.records_ignored += 1;
        }

        Ok(())
    }

    fn finish_table(&mut self, table: Table<'a>) {
        match table.state {
            TableState::DecodingRows { .. } => {
                debug!(
                    "Table `{}` done: {} rows, {} cached objects",
                    self.table_name(),
                    table.rows,
                    table.cache.len()
                );
                self.summary.tables_decoded += 1;
            }
            TableState::AwaitingSchema | TableState::Skipping => self.summary.tables_skipped += 1,
        }

        self.context.table = None;
        self.context.row_index = 0;
    }

    fn table_name(&self) -> &str {
        self.context.table.as_deref().unwrap_or("<unnamed>")
    }
}
