//! Dismob - run the bot from a terminal
//!
//! Settings come from the environment (a `.env` file is loaded first) and
//! can be overridden with flags. Every line typed on stdin is a message from
//! the console user; lines starting with `/` are slash commands.
//!
//! ```bash
//! BOT_TOKEN=... dismob --prefix '?'
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use dismob_core::{cogs, platform::ConsolePlatform, Bot, BotConfig, LogConfig};

#[derive(Parser)]
#[command(name = "dismob", version, about = "Plugin-extensible chat bot")]
struct Cli {
    /// Prefix of text commands
    #[arg(long, env = "BOT_PREFIX")]
    prefix: Option<String>,

    /// Directory holding config.json and module config files
    #[arg(long, env = "CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Console log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// File log level
    #[arg(long, env = "FILE_LOG_LEVEL", default_value = "info")]
    file_log_level: String,

    /// Log file
    #[arg(long, env = "LOG_FILE", default_value = "bot.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log = LogConfig {
        console_level: cli.log_level,
        file_level: cli.file_log_level,
        file_path: Some(cli.log_file),
    };
    let _guard = dismob_core::init(&log)?;

    let mut config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    if let Some(prefix) = cli.prefix {
        config.prefix = prefix;
    }
    if let Some(dir) = cli.config_dir {
        config.config_dir = dir;
    }
    config.log = log;
    info!("Starting with {:?}", config);

    let bot = Bot::new(config, Arc::new(ConsolePlatform::new()), cogs::catalog())?;

    let signal_bot = bot.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_bot.shutdown();
        }
    });

    bot.run().await?;
    Ok(ExitCode::SUCCESS)
}
