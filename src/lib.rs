// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod cad;
pub mod config;
pub mod publish;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::cad::types::{Category, Incident, PageFetcher, Payload};
pub use crate::config::AppConfig;
pub use crate::publish::{BusSession, Publisher};
