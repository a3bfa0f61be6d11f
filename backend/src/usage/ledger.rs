use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Default number of retained entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// One completed job, attributed to the caller that submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    #[serde(rename = "keyId")]
    pub caller_id: String,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl UsageEntry {
    /// Entry stamped with the current time.
    pub fn new(caller_id: &str, model: &str, prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            caller_id: caller_id.to_string(),
            timestamp: Utc::now(),
            model: model.to_string(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Aggregate over a filtered slice of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub total_requests: u64,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub total_tokens: u64,
}

/// Bounded append-only usage log. The oldest entries fall off once full.
#[derive(Debug)]
pub struct UsageLedger {
    max_entries: usize,
    entries: RwLock<VecDeque<UsageEntry>>,
}

impl UsageLedger {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: RwLock::new(VecDeque::new()),
        }
    }

    pub async fn record(&self, entry: UsageEntry) {
        let mut entries = self.entries.write().await;
        entries.push_back(entry);
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    /// Totals for entries matching `caller_id` (exact) and `timestamp >= since`.
    pub async fn summarize(&self, caller_id: Option<&str>, since: Option<DateTime<Utc>>) -> UsageSummary {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| matches(e, caller_id, since))
            .fold(UsageSummary::default(), |mut acc, e| {
                acc.total_requests += 1;
                acc.total_prompt_tokens += u64::from(e.prompt_tokens);
                acc.total_completion_tokens += u64::from(e.completion_tokens);
                acc.total_tokens += u64::from(e.total_tokens);
                acc
            })
    }

    /// The most recent `limit` matching entries, oldest first.
    pub async fn history(
        &self,
        caller_id: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Vec<UsageEntry> {
        let entries = self.entries.read().await;
        let mut recent: Vec<UsageEntry> = entries
            .iter()
            .rev()
            .filter(|e| matches(e, caller_id, since))
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

fn matches(entry: &UsageEntry, caller_id: Option<&str>, since: Option<DateTime<Utc>>) -> bool {
    caller_id.map_or(true, |id| entry.caller_id == id) && since.map_or(true, |t| entry.timestamp >= t)
}
