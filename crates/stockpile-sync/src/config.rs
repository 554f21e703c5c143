//! Sync configuration with environment overrides.
//!
//! Every knob has a production default and a `STOCKPILE_*` environment
//! variable; unparseable values are logged and fall back to the default so a
//! typo in deployment config never prevents startup.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use tracing::error;

const DEFAULT_FREQUENCY_HOURS: u64 = 24;
const DEFAULT_STALENESS_HOURS: u64 = 24;
const DEFAULT_MAX_SYMBOLS_PER_RUN: usize = 50;
const DEFAULT_RATE_LIMIT_SECS: f64 = 1.0;
const DEFAULT_JITTER_SECS: f64 = 0.5;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
const DEFAULT_INITIAL_START: &str = "2020-01-01";
const DEFAULT_CHUNK_DAYS: u32 = 365;
const DEFAULT_CHUNK_DELAY_MINUTES: u64 = 10;

/// Where a symbol's history begins when it has no rows yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialStart {
    /// Fixed calendar date.
    Date(NaiveDate),
    /// Rolling window ending today.
    DaysBack(u64),
}

impl InitialStart {
    /// The concrete first date to fetch, given the current date.
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            InitialStart::Date(date) => *date,
            InitialStart::DaysBack(days) => {
                today.checked_sub_days(Days::new(*days)).unwrap_or(today)
            }
        }
    }
}

/// Tunable behavior of the scheduler and backfill engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pause between periodic sync cycles.
    pub run_frequency: Duration,
    /// Age past which a cached snapshot is due for refresh.
    pub staleness_threshold: Duration,
    /// Upper bound on symbols processed in one cycle.
    pub max_symbols_per_run: usize,
    /// Base pause before each symbol's upstream calls.
    pub rate_limit: Duration,
    /// Random extra pause added on top of `rate_limit`.
    pub jitter: Duration,
    /// Reserved: upstream retry count, not yet wired to the fetch path.
    pub max_retries: u32,
    /// Reserved: pause between upstream retries.
    pub retry_delay: Duration,
    /// History origin for symbols with no stored rows.
    pub initial_start: InitialStart,
    /// Calendar days covered by one backfill chunk.
    pub chunk_days: u32,
    /// Pause between backfill chunks of the same symbol.
    pub chunk_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let initial = NaiveDate::parse_from_str(DEFAULT_INITIAL_START, "%Y-%m-%d")
            .unwrap_or_else(|_| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN));
        Self {
            run_frequency: Duration::from_secs(DEFAULT_FREQUENCY_HOURS * 60 * 60),
            staleness_threshold: Duration::from_secs(DEFAULT_STALENESS_HOURS * 60 * 60),
            max_symbols_per_run: DEFAULT_MAX_SYMBOLS_PER_RUN,
            rate_limit: Duration::from_secs_f64(DEFAULT_RATE_LIMIT_SECS),
            jitter: Duration::from_secs_f64(DEFAULT_JITTER_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            initial_start: InitialStart::Date(initial),
            chunk_days: DEFAULT_CHUNK_DAYS,
            chunk_delay: Duration::from_secs(DEFAULT_CHUNK_DELAY_MINUTES * 60),
        }
    }
}

impl SyncConfig {
    /// Load the config from `STOCKPILE_*` environment variables, falling back
    /// to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let initial_start = initial_start_from_env(defaults.initial_start);

        Self {
            run_frequency: Duration::from_secs(
                env_parse("STOCKPILE_FREQUENCY_HOURS", DEFAULT_FREQUENCY_HOURS) * 60 * 60,
            ),
            staleness_threshold: Duration::from_secs(
                env_parse("STOCKPILE_STALENESS_HOURS", DEFAULT_STALENESS_HOURS) * 60 * 60,
            ),
            max_symbols_per_run: env_parse(
                "STOCKPILE_MAX_SYMBOLS_PER_RUN",
                DEFAULT_MAX_SYMBOLS_PER_RUN,
            ),
            rate_limit: Duration::from_secs_f64(env_parse(
                "STOCKPILE_RATE_LIMIT_SECS",
                DEFAULT_RATE_LIMIT_SECS,
            )),
            jitter: Duration::from_secs_f64(env_parse(
                "STOCKPILE_JITTER_SECS",
                DEFAULT_JITTER_SECS,
            )),
            max_retries: env_parse("STOCKPILE_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            retry_delay: Duration::from_secs(env_parse(
                "STOCKPILE_RETRY_DELAY_SECS",
                DEFAULT_RETRY_DELAY_SECS,
            )),
            initial_start,
            chunk_days: env_parse("STOCKPILE_CHUNK_DAYS", DEFAULT_CHUNK_DAYS),
            chunk_delay: Duration::from_secs(
                env_parse("STOCKPILE_CHUNK_DELAY_MINUTES", DEFAULT_CHUNK_DELAY_MINUTES) * 60,
            ),
        }
    }
}

/// A fixed `STOCKPILE_INITIAL_START_DATE` wins over the rolling
/// `STOCKPILE_INITIAL_START_DAYS_BACK` window when both are set.
fn initial_start_from_env(default: InitialStart) -> InitialStart {
    if let Ok(raw) = env::var("STOCKPILE_INITIAL_START_DATE") {
        match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => return InitialStart::Date(date),
            Err(err) => {
                error!(value = %raw, %err, "invalid STOCKPILE_INITIAL_START_DATE, using default")
            }
        }
    }
    if let Ok(raw) = env::var("STOCKPILE_INITIAL_START_DAYS_BACK") {
        match raw.trim().parse::<u64>() {
            Ok(days) => return InitialStart::DaysBack(days),
            Err(err) => {
                error!(value = %raw, %err, "invalid STOCKPILE_INITIAL_START_DAYS_BACK, using default")
            }
        }
    }
    default
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
    T::Err: Display,
{
    let Ok(raw) = env::var(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(err) => {
            error!(%key, value = %raw, %err, "unparseable config value, using default");
            default
        }
    }
}
