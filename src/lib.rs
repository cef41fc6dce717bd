// Library interface for pitwall
// This allows integration tests to access internal modules

pub mod api;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod errors;
pub mod feed;
pub mod live;
pub mod model;
pub mod standings;
pub mod storage;
pub mod telemetry_lite;
pub mod writer;

// Re-export commonly used types
pub use api::{HttpApi, MockApi, PitwallApi};
pub use config::AppConfig;
pub use errors::PitwallError;
pub use live::{EventView, EventViewHandle, SelectionFallback, ViewCommand, ViewOptions};
pub use storage::{FileStore, KeyValueStore, MemoryStore, Preferences};
