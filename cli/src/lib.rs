mod cli;
mod console_writer;
mod transcript_printer;

use std::io::IsTerminal;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
pub use cli::Cli;
use codex_transcript::ConversationSnapshot;
use codex_transcript::ConversationStore;
use codex_transcript::SideEffect;
use codex_transcript::TranscriptConfigToml;
use codex_transcript::TranscriptEntry;
use codex_transcript::build_transcript_view;
use codex_transcript::parse_events_jsonl;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::console_writer::AnsiConsoleWriter;
use crate::console_writer::ConsoleWriter;
use crate::console_writer::PlainConsoleWriter;
use crate::transcript_printer::TranscriptPrinter;

const DEFAULT_LOG_LEVEL: &str = "error";

/// Output of `--json`.
#[derive(Serialize)]
struct JsonReport<'a> {
    snapshot: &'a ConversationSnapshot,
    view: &'a [TranscriptEntry],
    side_effects: &'a [SideEffect],
    event_count: usize,
}

pub fn run_main(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        input,
        json,
        collapse,
        config,
        reasoning_summary,
        no_ansi,
    } = cli;

    let mut config = match config.as_deref() {
        Some(path) => TranscriptConfigToml::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TranscriptConfigToml::default(),
    };
    if let Some(preference) = reasoning_summary {
        config.store.reasoning_summary = Some(preference.into());
    }

    let default_level = config.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
    let _ = tracing_subscriber::fmt()
        // Fallback to the configured log filter if the environment
        // variable is not set _or_ contains an invalid value
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(!no_ansi && std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();

    let contents = read_input(input.as_deref())?;
    let events = parse_events_jsonl(&contents)?;
    info!(events = events.len(), "replaying conversation");

    let mut store = ConversationStore::new(config.store);
    store.replay_history(events);
    let side_effects = store.drain_side_effects();
    let snapshot = store.snapshot();
    let view = build_transcript_view(snapshot.cells());
    debug!(cells = snapshot.log.len(), entries = view.len(), "built transcript view");

    if json {
        let report = JsonReport {
            snapshot: &snapshot,
            view: &view,
            side_effects: &side_effects,
            event_count: store.event_count(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let stdout = std::io::stdout();
    let writer: Box<dyn ConsoleWriter> = if !no_ansi && stdout.is_terminal() {
        Box::new(AnsiConsoleWriter::new(stdout))
    } else {
        Box::new(PlainConsoleWriter::new(stdout))
    };
    let mut printer = TranscriptPrinter::new(writer);
    if collapse {
        printer.print_view(&snapshot, &view);
    } else {
        printer.print_cells(&snapshot);
    }
    printer.print_side_effects(&side_effects);
    printer.print_totals(&snapshot, store.event_count());
    Ok(())
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read events from stdin")?;
            Ok(buffer)
        }
    }
}
