mod commands;
mod console;
mod logging;
mod replay;

use std::sync::Arc;

use anyhow::Context;
use scout_core::Reply;
use scout_engine::{BridgeConfig, Orchestrator};
use scout_logging::{scout_info, scout_warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::commands::Command;
use crate::console::ConsoleShell;
use crate::logging::LogDestination;
use crate::replay::ReplayEngine;

fn main() -> anyhow::Result<()> {
    logging::initialize(LogDestination::from_env());

    let mut config = BridgeConfig::from_env();
    config.output.extension = "jsonl".to_string();
    scout_info!(
        "Starting scout: license service {}, data dir {:?}",
        config.license.base_url,
        config.data_dir
    );

    let shell = Arc::new(ConsoleShell::stdio());
    let orchestrator = Orchestrator::new(config, shell.clone(), Arc::new(ReplayEngine::from_env()))
        .context("failed to start the orchestrator")?;
    emit(&shell, "ready", &orchestrator.get_state())?;

    while !shell.is_closed() {
        let Some(line) = shell.read_line().context("failed to read a command")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match commands::parse(&line) {
            Ok(command) => run(&orchestrator, &shell, command)?,
            Err(message) => emit(&shell, "reply", &Reply::error(message))?,
        }
    }

    if !shell.is_closed() {
        scout_warn!("Input closed; shutting down");
        orchestrator.exit_app();
    }
    scout_info!("Scout stopped");
    Ok(())
}

fn run(orchestrator: &Orchestrator, shell: &ConsoleShell, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Activate(key) => emit(shell, "reply", &orchestrator.activate(&key)),
        Command::Validate => emit(shell, "reply", &orchestrator.validate()),
        Command::EndSession => emit(shell, "reply", &orchestrator.end_session()),
        Command::Start(params) => emit(shell, "reply", &orchestrator.start_scrape(&params)),
        Command::Stop => emit(shell, "reply", &orchestrator.stop_scrape()),
        Command::State => emit(shell, "state", &orchestrator.get_state()),
        Command::Results(limit) => emit(shell, "results", &orchestrator.get_results(limit)),
        Command::Clear => emit(shell, "reply", &orchestrator.clear_results()),
        Command::Pick => emit(shell, "reply", &orchestrator.pick_directory()),
        Command::Open(path) => emit(shell, "reply", &orchestrator.open_folder(path.as_deref())),
        Command::Export => emit(shell, "reply", &orchestrator.export_data()),
        Command::Info => emit(
            shell,
            "info",
            &json!({
                "machine_hash": orchestrator.machine_hash(),
                "system": orchestrator.system_info(),
            }),
        ),
        Command::Quit => emit(shell, "reply", &orchestrator.exit_app()),
    }
}

fn emit(shell: &ConsoleShell, channel: &str, payload: &impl Serialize) -> anyhow::Result<()> {
    let payload: Value = serde_json::to_value(payload).context("unserializable reply")?;
    shell
        .emit(&json!({ "channel": channel, "payload": payload }))
        .context("failed to write to stdout")
}
