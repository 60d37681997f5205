// Core modules
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod history;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use engine::{StopEngine, TriggeredStop};
pub use error::{EngineError, StoreError};
pub use models::*;
pub use strategy::Strategy;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
