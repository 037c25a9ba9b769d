//! Dismob Core - plugin-extensible chat-bot framework
//!
//! This crate provides the core of dismob: loadable modules ("cogs"), command
//! routing with checks, typed events, JSON config persistence, rate-limited
//! sending helpers and a keyword-argument parser for command arguments.
//!
//! The chat service itself sits behind the [`Platform`](platform::Platform)
//! trait.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dismob_core::{cogs, platform::{PlatformEvent, RecordingPlatform}, Bot, BotConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let platform = Arc::new(RecordingPlatform::new(1));
//! platform.push_event(PlatformEvent::Ready);
//!
//! let bot = Bot::new(BotConfig::default(), platform.clone(), cogs::catalog())?;
//! bot.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod bot;
pub mod builtin;
pub mod cog;
pub mod cogs;
pub mod colors;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod kwargs;
pub mod logging;
pub mod messenger;
pub mod modules;
pub mod platform;
pub mod ratelimit;
pub mod store;
pub mod time;

// Re-exports
pub use bot::{Bot, BotBuilder, BotHandle, BotMetrics};
pub use cog::{Cog, CogCatalog};
pub use commands::{Check, Command, CommandRouter};
pub use config::{BotConfig, BotConfigBuilder};
pub use context::CommandContext;
pub use error::{Error, Result};
pub use kwargs::{Kwargs, ParseError};
pub use logging::LogConfig;
pub use modules::{ModuleError, ModuleManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging
///
/// Installs the global subscriber described by `config`. Keep the returned
/// guard alive for as long as the file log should be written.
///
/// # Errors
///
/// Returns an error if a level is invalid or a subscriber is already set.
///
/// # Example
///
/// ```rust
/// # fn main() -> anyhow::Result<()> {
/// let _guard = dismob_core::init(&dismob_core::LogConfig::console_only("info"))?;
/// # Ok(())
/// # }
/// ```
pub fn init(config: &LogConfig) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let guard = logging::init(config)?;
    tracing::info!("Dismob Core v{} initialized", VERSION);
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_init() {
        // Only the first call can install the subscriber
        let _ = init(&LogConfig::console_only("info"));
        assert!(init(&LogConfig::console_only("info")).is_err());
    }
}
