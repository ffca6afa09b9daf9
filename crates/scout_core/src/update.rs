use serde_json::{Map, Value};

use crate::{
    numeric_field, Effect, Msg, ProgressCounters, ProgressSnapshot, ShellEvent, Statistics,
    Status, StoreState, TaskOutcome, TaskStatus,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: StoreState, msg: Msg) -> (StoreState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested {
            params,
            output_path,
            started_at,
        } => {
            if state.status.is_active() {
                return (state, vec![Effect::Rejected(Status::AlreadyRunning)]);
            }
            let task_id = state.next_task_id;
            state.next_task_id += 1;
            state.task_id = Some(task_id);
            state.status = TaskStatus::Running;
            state.keyword = params.keyword;
            state.price_threshold = params.price_threshold;
            state.pinned_threshold = params.pinned_threshold;
            state.reviews_threshold = params.reviews_threshold;
            state.export_dir = Some(params.export_dir);
            state.output_path = Some(output_path);
            state.started_at = Some(started_at);
            state.counters = ProgressCounters::default();
            state.statistics = Statistics::default();
            state.results.clear();
            vec![
                Effect::Launch { task_id },
                Effect::Notify(ShellEvent::Status {
                    status: TaskStatus::Running,
                    terminal: false,
                }),
            ]
        }
        Msg::ItemReceived { task_id, item } => {
            if !state.owns(task_id) {
                return (state, vec![discarded(format!("item from stale task {task_id}"))]);
            }
            let price = numeric_field(&item, "price");
            let pinned = numeric_field(&item, "pinned");
            let (price, pinned) = match (price, pinned) {
                (Ok(price), Ok(pinned)) => (price, pinned),
                (Err(reason), _) | (_, Err(reason)) => return (state, vec![discarded(reason)]),
            };
            let features = state.features();
            if features.statistics {
                state.statistics.record(price, pinned);
            }
            if features.result_buffer {
                state.results.push(item.clone());
            }
            vec![Effect::Notify(ShellEvent::Item(item))]
        }
        Msg::ProgressReported { task_id, info, at } => {
            if !state.owns(task_id) {
                return (
                    state,
                    vec![discarded(format!("progress from stale task {task_id}"))],
                );
            }
            let Value::Object(fields) = &info else {
                return (
                    state,
                    vec![discarded(format!("progress payload is not an object: {info}"))],
                );
            };
            state.counters = ProgressCounters::from_info(&info);
            let extra: Map<String, Value> = fields
                .iter()
                .filter(|(key, _)| !is_reserved_progress_key(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let run_time = state
                .started_at
                .map(|started| (at - started).num_seconds().max(0))
                .unwrap_or(0);
            let snapshot = ProgressSnapshot {
                counters: state.counters.clone(),
                run_time,
                avg_price: state.statistics.avg_price(),
                avg_pinned: state.statistics.avg_pinned(),
                outfile: state
                    .output_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                extra,
            };
            vec![Effect::Notify(ShellEvent::Progress(snapshot))]
        }
        Msg::StopRequested => match (state.status, state.task_id) {
            (TaskStatus::Running, Some(task_id)) => {
                state.status = TaskStatus::Stopping;
                vec![
                    Effect::Cancel { task_id },
                    Effect::Notify(ShellEvent::Status {
                        status: TaskStatus::Stopping,
                        terminal: false,
                    }),
                ]
            }
            _ => vec![Effect::Rejected(Status::NotRunning)],
        },
        Msg::TaskFinished { task_id, outcome } => {
            // Only the first report for the live task counts.
            if !state.owns(task_id) {
                return (state, Vec::new());
            }
            state.status = match outcome {
                TaskOutcome::Completed | TaskOutcome::Cancelled => TaskStatus::Idle,
                TaskOutcome::Failed(_) => TaskStatus::Error,
            };
            vec![Effect::Notify(ShellEvent::Status {
                status: state.status,
                terminal: true,
            })]
        }
        Msg::ResultsCleared => {
            state.results.clear();
            Vec::new()
        }
        Msg::ExportDirChanged(dir) => {
            state.export_dir = Some(dir);
            Vec::new()
        }
        Msg::SessionChanged { license_id, active } => {
            if license_id.is_some() {
                state.license_id = license_id;
            }
            state.session_active = active;
            Vec::new()
        }
        Msg::ActivationChanged {
            license_id,
            activated,
        } => {
            if license_id.is_some() {
                state.license_id = license_id;
            }
            state.activated = activated;
            Vec::new()
        }
    };

    (state, effects)
}

fn is_reserved_progress_key(key: &str) -> bool {
    ProgressCounters::FIELDS.contains(&key)
        || matches!(key, "run_time" | "avg_price" | "avg_pinned" | "outfile")
}

fn discarded(reason: impl Into<String>) -> Effect {
    Effect::Discarded {
        reason: reason.into(),
    }
}
