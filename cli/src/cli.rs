use clap::Parser;
use clap::ValueEnum;
use codex_transcript_protocol::config_types::ReasoningSummary;
use std::path::PathBuf;

/// Replays a recorded conversation and prints the transcript it reduces to.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// JSONL file of conversation events. Reads stdin when omitted or `-`.
    pub input: Option<PathBuf>,

    /// Print the final snapshot, view and side effects as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Fold finished turns the way the desktop transcript does.
    #[arg(long, default_value_t = false)]
    pub collapse: bool,

    /// TOML file with a `[store]` table and an optional `log_level`.
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override whether reasoning summaries are shown.
    #[arg(long = "reasoning-summary")]
    pub reasoning_summary: Option<ReasoningSummaryCliArg>,

    /// Don't use colored ansi output.
    #[arg(long)]
    pub no_ansi: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum ReasoningSummaryCliArg {
    Auto,
    Concise,
    Detailed,
    /// Hide reasoning cells.
    None,
}

impl From<ReasoningSummaryCliArg> for ReasoningSummary {
    fn from(value: ReasoningSummaryCliArg) -> Self {
        match value {
            ReasoningSummaryCliArg::Auto => ReasoningSummary::Auto,
            ReasoningSummaryCliArg::Concise => ReasoningSummary::Concise,
            ReasoningSummaryCliArg::Detailed => ReasoningSummary::Detailed,
            ReasoningSummaryCliArg::None => ReasoningSummary::None,
        }
    }
}
