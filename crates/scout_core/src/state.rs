use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::view_model::{ResultsPage, StateSnapshot};
use crate::ScrapeDefaults;

pub type TaskId = u64;
pub type LicenseId = i64;

/// Maximum number of items kept for `get_results`.
pub const DEFAULT_RESULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    Stopping,
    Error,
}

impl TaskStatus {
    /// A task body is still live in this state.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Running | TaskStatus::Stopping)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Idle => "idle",
            TaskStatus::Running => "running",
            TaskStatus::Stopping => "stopping",
            TaskStatus::Error => "error",
        }
    }
}

/// Optional per-run bookkeeping. The basic profile runs without either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub statistics: bool,
    pub result_buffer: bool,
}

impl Features {
    pub fn basic() -> Self {
        Self {
            statistics: false,
            result_buffer: false,
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self {
            statistics: true,
            result_buffer: true,
        }
    }
}

/// Running sums over the items of the current task.
///
/// Averages are derived on read, so they can never disagree with the sums.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistics {
    sum_price: f64,
    sum_pinned: f64,
    count: u64,
}

impl Statistics {
    pub fn record(&mut self, price: f64, pinned: f64) {
        self.sum_price += price;
        self.sum_pinned += pinned;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum_price(&self) -> f64 {
        self.sum_price
    }

    pub fn sum_pinned(&self) -> f64 {
        self.sum_pinned
    }

    pub fn avg_price(&self) -> f64 {
        self.sum_price / self.count.max(1) as f64
    }

    pub fn avg_pinned(&self) -> f64 {
        self.sum_pinned / self.count.max(1) as f64
    }
}

/// Bounded FIFO of the most recent items.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBuffer {
    items: VecDeque<Value>,
    capacity: usize,
}

impl ResultBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an item, returning the evicted oldest entry when full.
    pub fn push(&mut self, item: Value) -> Option<Value> {
        if self.capacity == 0 {
            return None;
        }
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The newest `limit` items, oldest first.
    pub fn tail(&self, limit: usize) -> Vec<Value> {
        let skip = self.items.len().saturating_sub(limit);
        self.items.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }
}

impl Default for ResultBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_CAPACITY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    pub visited: u64,
    pub collected: u64,
    pub filtered: u64,
    pub list_count: u64,
    pub batch_progress: String,
}

impl Default for ProgressCounters {
    fn default() -> Self {
        Self {
            visited: 0,
            collected: 0,
            filtered: 0,
            list_count: 0,
            batch_progress: "0/0".to_string(),
        }
    }
}

impl ProgressCounters {
    pub const FIELDS: [&'static str; 5] =
        ["visited", "collected", "filtered", "list_count", "batch_progress"];

    /// Reads the counters out of a collaborator progress payload.
    ///
    /// Missing or malformed counters read as zero.
    pub fn from_info(info: &Value) -> Self {
        let count = |key: &str| match info.get(key) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v as u64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        let batch_progress = match info.get("batch_progress") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "0/0".to_string(),
            Some(other) => other.to_string(),
        };
        Self {
            visited: count("visited"),
            collected: count("collected"),
            filtered: count("filtered"),
            list_count: count("list_count"),
            batch_progress,
        }
    }
}

/// Reads a numeric item field. Missing or null reads as zero.
pub fn numeric_field(item: &Value, field: &str) -> Result<f64, String> {
    match item.get(field) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("{field} is not representable: {n}")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{field} is not numeric: {s:?}")),
        Some(other) => Err(format!("{field} has unexpected type: {other}")),
    }
}

/// Everything the control surface can observe, in one aggregate.
///
/// Field groups have a single writer each: the session manager writes the
/// license fields, the running task writes counters, statistics and results.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    features: Features,
    pub(crate) next_task_id: TaskId,
    pub(crate) task_id: Option<TaskId>,
    pub(crate) status: TaskStatus,
    pub(crate) keyword: String,
    pub(crate) price_threshold: f64,
    pub(crate) pinned_threshold: f64,
    pub(crate) reviews_threshold: u64,
    pub(crate) export_dir: Option<PathBuf>,
    pub(crate) output_path: Option<PathBuf>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) counters: ProgressCounters,
    pub(crate) statistics: Statistics,
    pub(crate) results: ResultBuffer,
    pub(crate) license_id: Option<LicenseId>,
    pub(crate) session_active: bool,
    pub(crate) activated: bool,
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new(
            Features::default(),
            DEFAULT_RESULT_CAPACITY,
            &ScrapeDefaults::default(),
        )
    }
}

impl StoreState {
    pub fn new(features: Features, result_capacity: usize, defaults: &ScrapeDefaults) -> Self {
        Self {
            features,
            next_task_id: 1,
            task_id: None,
            status: TaskStatus::Idle,
            keyword: defaults.keyword.clone(),
            price_threshold: defaults.price,
            pinned_threshold: defaults.pinned,
            reviews_threshold: defaults.reviews,
            export_dir: None,
            output_path: None,
            started_at: None,
            counters: ProgressCounters::default(),
            statistics: Statistics::default(),
            results: ResultBuffer::new(result_capacity),
            license_id: None,
            session_active: false,
            activated: false,
        }
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    pub fn export_dir(&self) -> Option<&Path> {
        self.export_dir.as_deref()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn counters(&self) -> &ProgressCounters {
        &self.counters
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn results(&self) -> &ResultBuffer {
        &self.results
    }

    pub fn license_id(&self) -> Option<LicenseId> {
        self.license_id
    }

    pub fn session_active(&self) -> bool {
        self.session_active
    }

    pub fn activated(&self) -> bool {
        self.activated
    }

    /// Whether `task_id` is the task currently owning the run fields.
    pub(crate) fn owns(&self, task_id: TaskId) -> bool {
        self.task_id == Some(task_id) && self.status.is_active()
    }

    pub fn view(&self, now: DateTime<Utc>) -> StateSnapshot {
        StateSnapshot {
            status: self.status,
            task_id: self.task_id,
            keyword: self.keyword.clone(),
            price: self.price_threshold,
            pinned: self.pinned_threshold,
            reviews: self.reviews_threshold,
            export_dir: self.export_dir.as_ref().map(|p| p.display().to_string()),
            outfile: self.output_path.as_ref().map(|p| p.display().to_string()),
            counters: self.counters.clone(),
            avg_price: self.statistics.avg_price(),
            avg_pinned: self.statistics.avg_pinned(),
            sum_price: self.statistics.sum_price(),
            sum_pinned: self.statistics.sum_pinned(),
            item_count: self.statistics.count(),
            results_len: self.results.len(),
            start_time: self.started_at,
            license_id: self.license_id,
            session_active: self.session_active,
            is_activated: self.activated,
            machine_hash: String::new(),
            now,
        }
    }

    pub fn results_page(&self, limit: usize) -> ResultsPage {
        ResultsPage {
            items: self.results.tail(limit),
            total: self.results.len(),
            collected: self.counters.collected,
            filtered: self.counters.filtered,
        }
    }
}
