use stockpile_sync::SyncScheduler;

use crate::error::CliError;

pub async fn run(scheduler: &SyncScheduler) -> Result<(), CliError> {
    let status = scheduler.status().await;
    let stats = scheduler
        .service()
        .store()
        .stats()
        .await
        .map_err(|err| CliError::Command(err.to_string()))?;

    println!("store_available  {}", status.store_available);
    println!("snapshots        {}", stats.snapshots);
    println!("price_rows       {}", stats.price_rows);
    Ok(())
}
