//! Common types and configuration shared across fathom crates.
//!
//! - **Configuration**: the read-only harness property set (`config`).
//! - **Models**: engine identifiers and the reuse threshold (`models`).
//! - **Telemetry**: `tracing` subscriber setup for test processes (`telemetry`).
pub mod config;
pub mod models;
pub mod telemetry;

pub use config::HarnessConfig;
pub use models::{EngineKind, ReuseThreshold};
