pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::handlers::HandlerKind;
pub use app::Services;
pub use config::cli::Fixtures;
pub use config::lambda::RuntimeConfig;
pub use core::engine::HandlerEngine;
pub use utils::error::{KnowledgeError, Result};
