//! The agent worker: picks up jobs from the hosted platform and runs one
//! assistant per room.

mod dispatch;

pub use dispatch::{JobSource, RoomLister, RoomPoller, ServiceRoomLister, StaticJobSource};

use crate::config::Settings;
use crate::error::{BlikkError, Result};
use crate::rtc::{HostedRoom, RoomConnection};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// An assignment to join one room.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub room_name: String,
    pub dispatched_at: DateTime<Utc>,
}

impl Job {
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            room_name: room_name.into(),
            dispatched_at: Utc::now(),
        }
    }
}

/// Connects jobs to rooms. The seam lets tests hand out loopback rooms.
#[async_trait]
pub trait RoomConnector: Send + Sync {
    async fn connect(&self, room_name: &str) -> Result<Arc<dyn RoomConnection>>;
}

/// Connector for the hosted platform.
pub struct HostedConnector {
    settings: Settings,
}

impl HostedConnector {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl RoomConnector for HostedConnector {
    async fn connect(&self, room_name: &str) -> Result<Arc<dyn RoomConnection>> {
        let room = HostedRoom::connect(
            &self.settings.room,
            room_name,
            &self.settings.worker.agent_identity,
        )
        .await?;
        Ok(room as Arc<dyn RoomConnection>)
    }
}

/// Per-job context handed to the entrypoint.
pub struct JobContext {
    job: Job,
    connector: Arc<dyn RoomConnector>,
    room: OnceLock<Arc<dyn RoomConnection>>,
}

impl JobContext {
    pub fn new(job: Job, connector: Arc<dyn RoomConnector>) -> Self {
        Self {
            job,
            connector,
            room: OnceLock::new(),
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Connect to the job's room. Must be called before [`Self::room`].
    pub async fn connect(&self) -> Result<()> {
        let room = self.connector.connect(&self.job.room_name).await?;
        self.room
            .set(room)
            .map_err(|_| BlikkError::Worker("job context already connected".to_string()))
    }

    /// The connected room.
    pub fn room(&self) -> Result<Arc<dyn RoomConnection>> {
        self.room
            .get()
            .cloned()
            .ok_or_else(|| BlikkError::Worker("job context is not connected".to_string()))
    }
}

/// The per-job entrypoint.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, ctx: JobContext) -> Result<()>;
}

/// Options for building a worker.
pub struct WorkerOptions {
    pub handler: Arc<dyn JobHandler>,
}

impl WorkerOptions {
    pub fn new(handler: Arc<dyn JobHandler>) -> Self {
        Self { handler }
    }
}

/// Listens for jobs and runs each in its own task until shutdown.
pub struct Worker {
    id: String,
    handler: Arc<dyn JobHandler>,
    connector: Arc<dyn RoomConnector>,
    source: Box<dyn JobSource>,
}

impl Worker {
    /// A worker that polls the platform's room service for active rooms.
    pub fn new(options: WorkerOptions, settings: &Settings) -> Result<Self> {
        settings.room.validate()?;
        let lister = ServiceRoomLister::new(&settings.room);
        let source = RoomPoller::new(
            Box::new(lister),
            std::time::Duration::from_millis(settings.worker.dispatch_poll_ms),
        );
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            handler: options.handler,
            connector: Arc::new(HostedConnector::new(settings.clone())),
            source: Box::new(source),
        })
    }

    /// A worker that joins a single named room and exits when done.
    pub fn direct(options: WorkerOptions, settings: &Settings, room_name: String) -> Result<Self> {
        settings.room.validate()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            handler: options.handler,
            connector: Arc::new(HostedConnector::new(settings.clone())),
            source: Box::new(StaticJobSource::new(room_name)),
        })
    }

    /// A worker with explicit source and connector, for tests and loopback
    /// runs.
    pub fn with_parts(
        options: WorkerOptions,
        source: Box<dyn JobSource>,
        connector: Arc<dyn RoomConnector>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            handler: options.handler,
            connector,
            source,
        }
    }

    /// Run until the job source is exhausted or ctrl-c arrives, then wind
    /// down the jobs still in flight.
    pub async fn run(mut self) -> Result<()> {
        info!("worker {} listening for jobs", self.id);
        let mut jobs: JoinSet<()> = JoinSet::new();
        let mut interrupted = false;

        loop {
            tokio::select! {
                job = self.source.next_job() => {
                    match job {
                        Some(job) => {
                            info!("dispatching job {} for room '{}'", job.id, job.room_name);
                            let handler = Arc::clone(&self.handler);
                            let ctx = JobContext::new(job.clone(), Arc::clone(&self.connector));
                            jobs.spawn(async move {
                                if let Err(e) = handler.handle(ctx).await {
                                    error!("job {} failed: {}", job.id, e);
                                }
                            });
                        }
                        None => {
                            info!("job source exhausted");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    interrupted = true;
                    break;
                }
            }
        }

        if interrupted {
            jobs.abort_all();
        }
        while let Some(result) = jobs.join_next().await {
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => warn!("job task failed: {}", e),
            }
        }
        info!("worker {} stopped", self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::LocalRoom;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct LoopbackConnector;

    #[async_trait]
    impl RoomConnector for LoopbackConnector {
        async fn connect(&self, room_name: &str) -> Result<Arc<dyn RoomConnection>> {
            Ok(Arc::new(LocalRoom::new(room_name)) as Arc<dyn RoomConnection>)
        }
    }

    struct CountingHandler {
        handled: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        async fn handle(&self, ctx: JobContext) -> Result<()> {
            ctx.connect().await?;
            let room = ctx.room()?;
            assert_eq!(room.name(), ctx.job().room_name);
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_worker_runs_static_job_to_completion() {
        let handled = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(CountingHandler {
            handled: Arc::clone(&handled),
        });

        let worker = Worker::with_parts(
            WorkerOptions::new(handler),
            Box::new(StaticJobSource::new("demo".to_string())),
            Arc::new(LoopbackConnector),
        );
        worker.run().await.unwrap();

        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_job_context_requires_connect() {
        let ctx = JobContext::new(Job::new("demo"), Arc::new(LoopbackConnector));
        assert!(ctx.room().is_err());
        ctx.connect().await.unwrap();
        assert!(ctx.room().is_ok());
    }

    #[tokio::test]
    async fn test_job_context_rejects_double_connect() {
        let ctx = JobContext::new(Job::new("demo"), Arc::new(LoopbackConnector));
        ctx.connect().await.unwrap();
        assert!(ctx.connect().await.is_err());
    }
}
