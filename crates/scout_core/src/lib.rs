//! Scout core: pure task/session state machine and snapshot helpers.
mod effect;
mod msg;
mod params;
mod state;
mod status;
mod update;
mod view_model;

pub use effect::{Channel, Effect, ShellEvent};
pub use msg::{Msg, TaskOutcome};
pub use params::{ParamError, RawScrapeParams, ScrapeDefaults, ScrapeParams};
pub use state::{
    numeric_field, Features, LicenseId, ProgressCounters, ResultBuffer, Statistics, StoreState,
    TaskId, TaskStatus, DEFAULT_RESULT_CAPACITY,
};
pub use status::{Reply, Status};
pub use update::update;
pub use view_model::{ProgressSnapshot, ResultsPage, StateSnapshot, DEFAULT_RESULTS_LIMIT};
