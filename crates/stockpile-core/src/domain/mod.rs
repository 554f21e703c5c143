pub mod records;
pub mod symbol;

pub use records::{snapshot_payload_is_usable, PriceRecord, SnapshotRecord};
pub use symbol::Symbol;
