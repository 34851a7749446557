//! Start command - run the agent worker.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::worker::{Worker, WorkerOptions};
use std::sync::Arc;

/// Run the worker, either in dispatch mode or against a single room.
pub async fn run_start(room: Option<&str>, settings: Settings) -> anyhow::Result<()> {
    let handler = Arc::new(Orchestrator::new(settings.clone())?);
    let options = WorkerOptions::new(handler);

    let worker = match room {
        Some(name) => {
            Output::info(&format!("Joining room '{}'", name));
            Worker::direct(options, &settings, name.to_string())?
        }
        None => {
            Output::info("Polling for active rooms (ctrl-c to stop)");
            Worker::new(options, &settings)?
        }
    };

    worker.run().await?;
    Output::success("Worker stopped.");
    Ok(())
}
