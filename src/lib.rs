pub mod app;
pub mod clock;
pub mod config;
pub mod confirm;
pub mod counters;
pub mod errors;
pub mod handlers;
pub mod history;
pub mod models;
pub mod render;
pub mod rollover;
pub mod state;
pub mod storage;

pub use app::router;
pub use config::Config;
pub use counters::Tracker;
pub use state::AppState;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
