use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;
use log::{LevelFilter, info};
use serde::Serialize;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use xctrace::{
    CancellationToken, Event, EventKind, ParseOutcome, ParserSettings, ParsingContext,
    ProcessingResult, TraceParser,
};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    JsonLines,
}

/// One line (or document) of output.
#[derive(Serialize)]
struct DumpedRecord<'a> {
    source: &'a str,
    table: Option<&'a str>,
    row: u64,
    event: &'a Event,
}

struct XctraceDump {
    parser_settings: ParserSettings,
    input: Vec<PathBuf>,
    kinds: Option<Vec<EventKind>>,
    output_format: OutputFormat,
    output: Box<dyn Write>,
    verbosity_level: Option<LevelFilter>,
}

/// Tries to write a line to a given target, aborts program if fails.
macro_rules! try_writeln {
    ($($arg:tt)*) => (
        match writeln!($($arg)*) {
            Ok(_) => {},
            Err(e) => {
                eprintln!("{}", &e);
                exit(1)
            }
        }
    );
}

impl XctraceDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input: Vec<PathBuf> = matches
            .get_many::<PathBuf>("INPUT")
            .ok_or_else(|| format_err!("at least one input is required"))?
            .cloned()
            .collect();

        let output_format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
        {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::JsonLines,
        };

        let kinds = matches
            .get_many::<EventKind>("kind")
            .map(|kinds| kinds.copied().collect());

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            3 => Some(LevelFilter::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(LevelFilter::Trace)
            }
        };

        let mut parser_settings = ParserSettings::new();

        if let Some(names) = matches.get_many::<String>("counter-name") {
            parser_settings = parser_settings.counter_names(names.cloned());
        }

        if let Some(types) = matches.get_many::<String>("rescan-type") {
            parser_settings = parser_settings.rescan_engineering_types(types.cloned());
        }

        if let Some(types) = matches.get_many::<String>("empty-aggregate") {
            parser_settings = parser_settings.empty_aggregates(types.cloned());
        }

        let output: Box<dyn Write> = match matches.get_one::<PathBuf>("output-target") {
            Some(path) => {
                let file = Self::create_output_file(path, !matches.get_flag("no-confirm-overwrite"))
                    .with_context(|| {
                        format!(
                            "An error occurred while creating output file at `{}`",
                            path.display()
                        )
                    })?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(io::stdout())),
        };

        Ok(XctraceDump {
            parser_settings,
            input,
            kinds,
            output_format,
            output,
            verbosity_level,
        })
    }

    /// Main entry point for `XctraceDump`
    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let parser = TraceParser::from_paths(&self.input)?
            .with_configuration(self.parser_settings.clone());

        let kinds = self.kinds.clone();
        let output_format = self.output_format;
        let output = &mut self.output;

        let mut last_reported = None;
        let progress = |percent: u8| {
            if last_reported != Some(percent) {
                last_reported = Some(percent);
                info!("{}%", percent);
            }
        };

        let mut sink = |event: Event, context: &ParsingContext, _: &CancellationToken| {
            if let Some(kinds) = &kinds
                && !kinds.contains(&event.kind())
            {
                return ProcessingResult::Ignored;
            }

            let record = DumpedRecord {
                source: &context.source_name,
                table: context.table.as_deref(),
                row: context.row_index,
                event: &event,
            };

            let rendered = match output_format {
                OutputFormat::Json => serde_json::to_string_pretty(&record),
                OutputFormat::JsonLines => serde_json::to_string(&record),
            };

            match rendered {
                Ok(rendered) => try_writeln!(output, "{}", rendered),
                Err(e) => eprintln!("Failed to serialize record: {}", e),
            }

            ProcessingResult::Processed
        };

        let outcome = parser.process(&mut sink, progress, &CancellationToken::new())?;
        self.output.flush()?;

        Self::print_outcome(&outcome);
        Ok(())
    }

    fn print_outcome(outcome: &ParseOutcome) {
        let ParseOutcome { bounds, summary } = outcome;

        eprintln!(
            "first event: {} ns, last event: {} ns (parsed at {})",
            bounds.first_timestamp_ns, bounds.last_timestamp_ns, bounds.wall_clock
        );
        eprintln!(
            "{} records from {} tables, {} tables skipped, {} records filtered out{}",
            summary.records_emitted,
            summary.tables_decoded,
            summary.tables_skipped,
            summary.records_ignored,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() {
            if prompt {
                match Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to override output file at {}",
                        p.display()
                    ))
                    .default(false)
                    .interact()
                {
                    Ok(true) => Ok(File::create(p)?),
                    Ok(false) => bail!("Cancelled"),
                    Err(e) => bail!(
                        "Failed to write confirmation prompt to term caused by\n{}",
                        e
                    ),
                }
            } else {
                Ok(File::create(p)?)
            }
        } else {
            // Ok to assume p is not an existing directory
            match p.parent() {
                Some(parent) => {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        fs::create_dir_all(parent)?;
                    }
                    Ok(File::create(p)?)
                }
                None => bail!("Output file cannot be root."),
            }
        }
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = TermLogger::init(
                level,
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {}", e);
            }
        }
    }
}

fn cli() -> Command {
    Command::new("xctrace_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to decode `xctrace export` captures")
        .long_about(indoc!(r#"
            Decodes one or more `xctrace export` captures (concatenated XML fragments, one per
            exported table) and prints every row of a known table as JSON.

            The time range of the decoded records and a summary are printed to stderr.
        "#))
        .arg(
            Arg::new("INPUT")
                .required(true)
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Capture files, processed in order."),
        )
        .arg(
            Arg::new("output-format")
                .long("format")
                .value_parser(["json", "jsonl"])
                .default_value("jsonl")
                .help("Sets the output format")
                .long_help(indoc!(r#"
                    Sets the output format:
                        "json"  - pretty prints every record.
                        "jsonl" - one record per line.
                "#)),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('o')
                .value_parser(clap::value_parser!(PathBuf))
                .help(indoc!("Writes output to the file specified instead of stdout, errors will still be printed to stderr.
                       Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`
                       Will create parent directories if needed.")),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("kind")
                .long("kind")
                .action(ArgAction::Append)
                .value_parser(|s: &str| s.parse::<EventKind>())
                .help("Only print records of this kind (e.g. `time-profile`). Can be passed multiple times."),
        )
        .arg(
            Arg::new("counter-name")
                .long("counter-name")
                .action(ArgAction::Append)
                .help("Name of the next hardware counter in `pmc-events` values. Can be passed multiple times."),
        )
        .arg(
            Arg::new("rescan-type")
                .long("rescan-type")
                .action(ArgAction::Append)
                .help("Replaces the column types whose children are scanned for object definitions (default: narrative, formatted-label)."),
        )
        .arg(
            Arg::new("empty-aggregate")
                .long("empty-aggregate")
                .action(ArgAction::Append)
                .help("Replaces the types that decode to nothing when they have no children (default: frame, thread)."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help(indoc!(r#"
                    Sets debug prints level for the application:
                        -v   - info
                        -vv  - debug
                        -vvv - trace
                    NOTE: trace output is only available in debug builds, as it is extremely verbose."#)),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let mut app = XctraceDump::from_cli_matches(&matches)?;
    app.run()
}
