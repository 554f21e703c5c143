use tracing::info;

use stockpile_sync::SyncScheduler;

use crate::error::CliError;

/// Run the periodic loop in the foreground until Ctrl-C.
pub async fn run(scheduler: &SyncScheduler) -> Result<(), CliError> {
    scheduler.start().await;

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");

    scheduler.stop().await;
    Ok(())
}
