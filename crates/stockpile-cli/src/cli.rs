use clap::{Args, Parser, Subcommand};

/// Cached market-data service over Yahoo Finance and SQLite.
#[derive(Debug, Parser)]
#[command(name = "stockpile", version, about)]
pub struct Cli {
    /// SQLite database URL.
    #[arg(
        long,
        global = true,
        env = "STOCKPILE_DB",
        default_value = "sqlite://stockpile.db?mode=rwc"
    )]
    pub db: String,

    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a symbol's snapshot, fetching it upstream on a miss.
    Snapshot(SnapshotArgs),
    /// Print daily price history for a date range.
    History(HistoryArgs),
    /// Run one sync cycle to completion and exit.
    Cycle,
    /// Run the periodic sync scheduler until interrupted.
    Run,
    /// Print the effective sync configuration.
    Config,
    /// Report store availability and row counts.
    Status,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Ticker symbol, e.g. AAPL or 0700.HK.
    pub symbol: String,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Ticker symbol.
    pub symbol: String,

    /// First date of the window (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub start: String,

    /// Last date of the window (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub end: String,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}
