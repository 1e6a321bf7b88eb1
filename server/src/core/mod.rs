//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod shutdown;

pub use crate::app::CoreApp;
pub use cli::{CliConfig, Commands, KeysCommands};
pub use config::{AccountConfig, AppConfig, PricingConfig, ServerConfig, SessionsConfig};
pub use shutdown::ShutdownService;
