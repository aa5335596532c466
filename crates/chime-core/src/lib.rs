//! `chime-core` — shared configuration and payload types for the chime
//! scheduling engine.
//!
//! Kept deliberately small: the engine itself lives in `chime-scheduler`;
//! this crate holds only what the engine and its hosts must agree on: the
//! [`config::ChimeConfig`] the host loads once and passes down, and the opaque
//! [`task::Task`] descriptor that travels from a schedule into a work queue.

pub mod config;
pub mod error;
pub mod task;

pub use config::ChimeConfig;
pub use error::{ConfigError, Result};
pub use task::Task;
