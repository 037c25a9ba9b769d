//! `ping` module

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::bot::BotHandle;
use crate::cog::Cog;
use crate::commands::Command;
use crate::context::CommandContext;
use crate::error::Result;
use crate::events::Handler;

/// Answers `ping` with `pong`
#[derive(Default)]
pub struct Ping {
    on_ready: Arc<Mutex<Option<Handler<BotHandle>>>>,
}

impl Ping {
    /// Create the module
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

async fn ping(ctx: CommandContext) -> Result<()> {
    ctx.reply("pong").await;
    Ok(())
}

#[async_trait]
impl Cog for Ping {
    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> &str {
        "Check that the bot answers"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("ping", ping).description("Answer with pong")]
    }

    async fn setup(&mut self, bot: &BotHandle) -> Result<()> {
        // Only the first ready event after loading is logged.
        let own = Arc::clone(&self.on_ready);
        let handler: Handler<BotHandle> = Arc::new(move |bot: &BotHandle| {
            info!("Ping module is ready");
            if let Some(me) = own.lock().take() {
                bot.events().on_ready.unregister(&me);
            }
        });
        *self.on_ready.lock() = Some(Arc::clone(&handler));
        bot.events().on_ready.register(handler);
        Ok(())
    }

    async fn teardown(&mut self, bot: &BotHandle) -> Result<()> {
        let handler = self.on_ready.lock().take();
        if let Some(handler) = handler {
            bot.events().on_ready.unregister(&handler);
        }
        Ok(())
    }
}
