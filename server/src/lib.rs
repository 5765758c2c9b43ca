//! Helpdesk server: configuration and wiring of the workspace crates into
//! one HTTP application.

pub mod app;
pub mod config;

pub use app::{Application, build};
pub use config::{Config, ConfigError};
