//! Core engine module
//!
//! Contains the engine loops, their shared context and configuration

mod config;
mod context;
mod engine;
mod error;
mod events;
mod host;
mod logging;
mod stats;
mod tasks;
mod time;

pub use config::{EngineConfig, MAX_FPS_LIMIT, MIN_TICK};
pub use context::EngineContext;
pub use engine::{Engine, Game};
pub use error::{ConfigError, EngineError};
pub use events::{EngineEvent, EventQueue};
pub use host::{EngineHandle, HeadlessHost, Host};
pub use logging::{DEFAULT_FILTER, init_logging};
pub use stats::{EngineStats, LoopStats, REPORT_INTERVAL, STATS_WINDOW};
pub use tasks::{BackgroundTask, FireOnce};
pub use time::Time;
