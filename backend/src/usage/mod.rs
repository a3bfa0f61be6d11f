//! Usage accounting for completed inference jobs.

mod ledger;

pub use ledger::{UsageEntry, UsageLedger, UsageSummary, DEFAULT_MAX_ENTRIES};
