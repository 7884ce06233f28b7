use crate::clock::SystemClock;
use crate::counters::Tracker;
use crate::errors::AppError;
use crate::storage::FileStore;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type ServerTracker = Tracker<FileStore, SystemClock>;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Mutex<ServerTracker>>,
}

impl AppState {
    pub fn new(tracker: ServerTracker) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(tracker)),
        }
    }

    /// Runs `f` on the blocking pool with the tracker locked. Anything that
    /// may write to disk goes through here.
    pub async fn with_tracker<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut ServerTracker) -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut tracker = Arc::clone(&self.tracker).lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut tracker))
            .await
            .map_err(AppError::internal)
    }
}
