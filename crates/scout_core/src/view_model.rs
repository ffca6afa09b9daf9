use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{LicenseId, ProgressCounters, TaskId, TaskStatus};

/// Default page size for `get_results`.
pub const DEFAULT_RESULTS_LIMIT: usize = 50;

/// Point-in-time copy of the shared state, taken under a single lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub status: TaskStatus,
    pub task_id: Option<TaskId>,
    pub keyword: String,
    pub price: f64,
    pub pinned: f64,
    pub reviews: u64,
    pub export_dir: Option<String>,
    pub outfile: Option<String>,
    #[serde(flatten)]
    pub counters: ProgressCounters,
    pub avg_price: f64,
    pub avg_pinned: f64,
    pub sum_price: f64,
    pub sum_pinned: f64,
    pub item_count: u64,
    pub results_len: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub license_id: Option<LicenseId>,
    pub session_active: bool,
    pub is_activated: bool,
    pub machine_hash: String,
    pub now: DateTime<Utc>,
}

/// Progress notification pushed on the `progress` channel.
///
/// Carries the collaborator's own fields (`extra`) next to the normalized
/// counters and the derived run figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    #[serde(flatten)]
    pub counters: ProgressCounters,
    pub run_time: i64,
    pub avg_price: f64,
    pub avg_pinned: f64,
    pub outfile: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsPage {
    pub items: Vec<Value>,
    pub total: usize,
    pub collected: u64,
    pub filtered: u64,
}
