use stockpile_sync::{InitialStart, SyncConfig};

use crate::error::CliError;

pub fn run(config: &SyncConfig) -> Result<(), CliError> {
    println!("run_frequency        {:?}", config.run_frequency);
    println!("staleness_threshold  {:?}", config.staleness_threshold);
    println!("max_symbols_per_run  {}", config.max_symbols_per_run);
    println!("rate_limit           {:?}", config.rate_limit);
    println!("jitter               {:?}", config.jitter);
    println!("max_retries          {}", config.max_retries);
    println!("retry_delay          {:?}", config.retry_delay);
    match config.initial_start {
        InitialStart::Date(date) => println!("initial_start        {date}"),
        InitialStart::DaysBack(days) => println!("initial_start        {days} days back"),
    }
    println!("chunk_days           {}", config.chunk_days);
    println!("chunk_delay          {:?}", config.chunk_delay);
    Ok(())
}
