mod config;
mod cycle;
mod history;
mod serve;
mod snapshot;
mod status;

use std::sync::Arc;

use stockpile_core::YahooProvider;
use stockpile_store::{Store, StoreConfig};
use stockpile_sync::{SyncConfig, SyncScheduler};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let store = Store::open(StoreConfig::new(cli.db.clone())).await;
    let provider = Arc::new(YahooProvider::new());
    let config = SyncConfig::from_env();
    let scheduler = SyncScheduler::new(store, provider, config);

    match cli.command {
        Command::Snapshot(args) => snapshot::run(&args, scheduler.service()).await,
        Command::History(args) => history::run(&args, scheduler.service()).await,
        Command::Cycle => cycle::run(&scheduler).await,
        Command::Run => serve::run(&scheduler).await,
        Command::Config => config::run(scheduler.config()),
        Command::Status => status::run(&scheduler).await,
    }
}
