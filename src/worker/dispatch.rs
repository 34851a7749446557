//! Job sources: where room assignments come from.

use super::Job;
use crate::config::RoomSettings;
use crate::error::{BlikkError, Result};
use async_trait::async_trait;
use livekit_api::services::room::RoomClient;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Yields jobs for the worker. Returning `None` means no more jobs will
/// ever arrive and the worker may exit.
#[async_trait]
pub trait JobSource: Send {
    async fn next_job(&mut self) -> Option<Job>;
}

/// Enumerates the active rooms on the platform.
#[async_trait]
pub trait RoomLister: Send + Sync {
    async fn list_room_names(&self) -> Result<Vec<String>>;
}

/// Room enumeration over the platform's room service.
pub struct ServiceRoomLister {
    client: RoomClient,
}

impl ServiceRoomLister {
    pub fn new(settings: &RoomSettings) -> Self {
        Self {
            client: RoomClient::with_api_key(
                &settings.service_url(),
                &settings.api_key,
                &settings.api_secret,
            ),
        }
    }
}

#[async_trait]
impl RoomLister for ServiceRoomLister {
    async fn list_room_names(&self) -> Result<Vec<String>> {
        let rooms = self
            .client
            .list_rooms(Vec::new())
            .await
            .map_err(|e| BlikkError::RoomService(e.to_string()))?;
        Ok(rooms.into_iter().map(|r| r.name).collect())
    }
}

/// Polls the room listing and yields one job per room it has not seen
/// before. Listing errors are transient: log and poll again.
pub struct RoomPoller {
    lister: Box<dyn RoomLister>,
    interval: Duration,
    seen: HashSet<String>,
}

impl RoomPoller {
    pub fn new(lister: Box<dyn RoomLister>, interval: Duration) -> Self {
        Self {
            lister,
            interval,
            seen: HashSet::new(),
        }
    }
}

#[async_trait]
impl JobSource for RoomPoller {
    async fn next_job(&mut self) -> Option<Job> {
        loop {
            match self.lister.list_room_names().await {
                Ok(names) => {
                    for name in names {
                        if self.seen.insert(name.clone()) {
                            debug!("new room '{}' discovered", name);
                            return Some(Job::new(name));
                        }
                    }
                }
                Err(e) => {
                    warn!("room listing failed: {}", e);
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Yields exactly one job for a named room, then ends.
pub struct StaticJobSource {
    room_name: Option<String>,
}

impl StaticJobSource {
    pub fn new(room_name: String) -> Self {
        Self {
            room_name: Some(room_name),
        }
    }
}

#[async_trait]
impl JobSource for StaticJobSource {
    async fn next_job(&mut self) -> Option<Job> {
        self.room_name.take().map(Job::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Lister replaying a fixed sequence of listings.
    struct ScriptedLister {
        listings: Mutex<Vec<Result<Vec<String>>>>,
    }

    impl ScriptedLister {
        fn new(listings: Vec<Result<Vec<String>>>) -> Self {
            Self {
                listings: Mutex::new(listings),
            }
        }
    }

    #[async_trait]
    impl RoomLister for ScriptedLister {
        async fn list_room_names(&self) -> Result<Vec<String>> {
            let mut listings = self.listings.lock().unwrap();
            if listings.is_empty() {
                Ok(Vec::new())
            } else {
                listings.remove(0)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_yields_each_room_once() {
        let lister = ScriptedLister::new(vec![
            Ok(vec!["alpha".to_string()]),
            Ok(vec!["alpha".to_string(), "beta".to_string()]),
        ]);
        let mut poller = RoomPoller::new(Box::new(lister), Duration::from_millis(100));

        let first = poller.next_job().await.unwrap();
        assert_eq!(first.room_name, "alpha");

        let second = poller.next_job().await.unwrap();
        assert_eq!(second.room_name, "beta");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_survives_listing_errors() {
        let lister = ScriptedLister::new(vec![
            Err(BlikkError::RoomService("unavailable".to_string())),
            Ok(vec!["gamma".to_string()]),
        ]);
        let mut poller = RoomPoller::new(Box::new(lister), Duration::from_millis(100));

        let job = poller.next_job().await.unwrap();
        assert_eq!(job.room_name, "gamma");
    }

    #[tokio::test]
    async fn test_static_source_yields_once() {
        let mut source = StaticJobSource::new("solo".to_string());
        assert_eq!(source.next_job().await.map(|j| j.room_name), Some("solo".to_string()));
        assert!(source.next_job().await.is_none());
    }
}
