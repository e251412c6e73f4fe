//! Entry-point for the `codex-transcript` binary.
use clap::Parser;
use codex_transcript_cli::Cli;
use codex_transcript_cli::run_main;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_main(cli)
}
