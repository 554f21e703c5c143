use stockpile_sync::SyncScheduler;

use crate::error::CliError;

pub async fn run(scheduler: &SyncScheduler) -> Result<(), CliError> {
    let report = scheduler.run_cycle().await;

    if report.faulted {
        return Err(CliError::Command(
            "sync cycle could not run, see logs".to_string(),
        ));
    }

    println!(
        "selected={} refreshed={} failed={} cancelled={}",
        report.selected, report.refreshed, report.failed, report.cancelled
    );
    Ok(())
}
