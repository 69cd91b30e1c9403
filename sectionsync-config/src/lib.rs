//! Configuration for the sectionsync engine.
//!
//! Loads [`EngineConfig`] from files or the environment, installs the
//! tracing subscriber and connects the Postgres status store so binaries
//! embedding the engine share one set of defaults.

pub mod models;
pub mod telemetry;
pub mod wiring;

pub use models::{
    ConfigSource, DatabaseConfig, EngineConfig, EventsConfig, LoggingConfig,
};
pub use telemetry::init_tracing;
pub use wiring::{connect_status_store, status_bus};
