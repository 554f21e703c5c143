use chrono::NaiveDate;
use stockpile_core::{Symbol, ValidationError};
use stockpile_sync::MarketDataService;

use crate::cli::HistoryArgs;
use crate::error::CliError;

pub async fn run(args: &HistoryArgs, service: &MarketDataService) -> Result<(), CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let start = parse_date(&args.start)?;
    let end = parse_date(&args.end)?;
    if start > end {
        return Err(ValidationError::InvertedDateRange {
            start: args.start.clone(),
            end: args.end.clone(),
        }
        .into());
    }

    match service.get_price_range(&symbol, start, end).await {
        Some(rows) => {
            let rendered = if args.pretty {
                serde_json::to_string_pretty(&rows)?
            } else {
                serde_json::to_string(&rows)?
            };
            println!("{rendered}");
            Ok(())
        }
        None => Err(CliError::Command(format!(
            "could not fetch history for {symbol}"
        ))),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        value: raw.to_string(),
    })
}
