//! Video track acquisition and frame caching.

mod watcher;

pub use watcher::{find_video_track, VideoWatcher, TRACK_SEARCH_ATTEMPTS};
