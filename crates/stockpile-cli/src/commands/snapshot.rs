use stockpile_core::Symbol;
use stockpile_sync::MarketDataService;

use crate::cli::SnapshotArgs;
use crate::error::CliError;

pub async fn run(args: &SnapshotArgs, service: &MarketDataService) -> Result<(), CliError> {
    let symbol = Symbol::parse(&args.symbol)?;

    match service.get_snapshot(&symbol).await {
        Some(record) => {
            let rendered = if args.pretty {
                serde_json::to_string_pretty(&record)?
            } else {
                serde_json::to_string(&record)?
            };
            println!("{rendered}");
            Ok(())
        }
        None => Err(CliError::Command(format!(
            "no snapshot available for {symbol}"
        ))),
    }
}
