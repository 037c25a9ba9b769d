//! `announce` module
//!
//! Posts an embed built from keyword arguments:
//!
//! ```text
//! !announce title="Maintenance" message="Back in 10 minutes" color=orange channel=123
//! ```
//!
//! Defaults for the title and colour come from `config.announce.json` in the config
//! directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cog::Cog;
use crate::colors::str_to_color;
use crate::commands::{Check, Command};
use crate::context::CommandContext;
use crate::error::{Error, Result};
use crate::platform::{ChannelId, Embed, OutgoingMessage};

const MODULE: &str = "announce";

/// Contents of `config.announce.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceSettings {
    /// Colour used when none is given
    pub color: String,
    /// Title used when none is given
    pub title: Option<String>,
}

impl Default for AnnounceSettings {
    fn default() -> Self {
        Self {
            color: "blurple".to_string(),
            title: None,
        }
    }
}

/// Kwargs-driven announcements
#[derive(Debug, Default)]
pub struct Announce;

impl Announce {
    /// Create the module
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Accepts a raw ID or a `<#id>` channel mention
fn parse_channel(input: &str) -> Option<ChannelId> {
    let id = input
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(input);
    id.parse().ok()
}

async fn announce(ctx: CommandContext) -> Result<()> {
    let kwargs = ctx.kwargs()?;
    let settings: AnnounceSettings = ctx.handle().store().load(Some(MODULE));

    let message = kwargs
        .get("message")
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput("You must provide a `message` to announce.".to_string()))?;

    let channel = match kwargs.get("channel") {
        Some(raw) => parse_channel(raw)
            .ok_or_else(|| Error::InvalidInput(format!("Invalid channel `{raw}`.")))?,
        None => ctx.channel_id(),
    };

    let color = str_to_color(kwargs.get("color").unwrap_or(settings.color.as_str()));
    let mut embed = Embed::new(message, color);
    if let Some(title) = kwargs.get("title").map(str::to_string).or(settings.title) {
        embed = embed.title(title);
    }

    let message_id = ctx
        .handle()
        .messenger()
        .send(channel, OutgoingMessage::embed(embed))
        .await?;
    info!(channel, message_id, author = ctx.author().id, "Announcement posted");

    // Slash commands must be answered; text commands were deleted already.
    if ctx.is_interaction() {
        ctx.success("Announcement posted.").await;
    }
    Ok(())
}

#[async_trait]
impl Cog for Announce {
    fn name(&self) -> &str {
        MODULE
    }

    fn description(&self) -> &str {
        "Post announcements as embeds"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("announce", announce)
            .description("Post an announcement: title, message, color, channel")
            .check(Check::AdminOnly)
            .guild_only()
            .suppress()
            .slash()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::{message, owner, test_bot};
    use crate::colors::Color;
    use crate::platform::{Author, PlatformError, PlatformEvent};

    #[test]
    fn test_parse_channel() {
        assert_eq!(parse_channel("123"), Some(123));
        assert_eq!(parse_channel("<#456>"), Some(456));
        assert_eq!(parse_channel("general"), None);
        assert_eq!(parse_channel("<#abc>"), None);
    }

    #[tokio::test]
    async fn test_announce_to_other_channel() {
        let (bot, platform, _dir) = test_bot();
        bot.modules().lock().await.load("announce").await.unwrap();

        let msg = message(
            10,
            owner(),
            r#"!announce title="News" message="Hello all" color=red channel=<#77>"#,
        );
        let id = msg.id;
        bot.handle_event(PlatformEvent::MessageCreate(msg)).await;

        let sent = platform.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 77);
        let embed = sent[0].1.embed.as_ref().unwrap();
        assert_eq!(embed.title.as_deref(), Some("News"));
        assert_eq!(embed.description, "Hello all");
        assert_eq!(embed.color, Color::RED);
        assert_eq!(platform.deleted(), vec![(10, id)]);
    }

    #[tokio::test]
    async fn test_settings_provide_defaults() {
        let (bot, platform, _dir) = test_bot();
        bot.handle()
            .store()
            .store(
                Some(MODULE),
                &AnnounceSettings {
                    color: "green".to_string(),
                    title: Some("Heads up".to_string()),
                },
            )
            .unwrap();
        bot.modules().lock().await.load("announce").await.unwrap();

        bot.handle_event(PlatformEvent::MessageCreate(message(
            10,
            owner(),
            "!announce message=hi",
        )))
        .await;

        let sent = platform.sent();
        let embed = sent[0].1.embed.as_ref().unwrap();
        assert_eq!(sent[0].0, 10);
        assert_eq!(embed.title.as_deref(), Some("Heads up"));
        assert_eq!(embed.color, Color::GREEN);
    }

    #[tokio::test]
    async fn test_missing_message() {
        let (bot, platform, _dir) = test_bot();
        bot.modules().lock().await.load("announce").await.unwrap();

        bot.handle_event(PlatformEvent::MessageCreate(message(
            10,
            owner(),
            "!announce title=Empty",
        )))
        .await;

        assert_eq!(
            platform.sent_texts(),
            vec!["You must provide a `message` to announce."]
        );
    }

    #[tokio::test]
    async fn test_malformed_kwargs() {
        let (bot, platform, _dir) = test_bot();
        bot.modules().lock().await.load("announce").await.unwrap();

        bot.handle_event(PlatformEvent::MessageCreate(message(
            10,
            owner(),
            "!announce message==hi",
        )))
        .await;

        let sent = platform.sent();
        assert_eq!(sent.len(), 1);
        let embed = sent[0].1.embed.as_ref().unwrap();
        assert_eq!(embed.title.as_deref(), Some(":x: Error"));
        assert_eq!(bot.metrics().errors_total(), 1);
    }

    #[tokio::test]
    async fn test_requires_admin() {
        let (bot, platform, _dir) = test_bot();
        bot.modules().lock().await.load("announce").await.unwrap();

        bot.handle_event(PlatformEvent::MessageCreate(message(
            10,
            Author::new(2, "bob"),
            "!announce message=hi",
        )))
        .await;

        assert_eq!(platform.sent_texts(), vec!["A check failed in the command."]);
        assert!(platform.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_channel_is_reported() {
        let (bot, platform, _dir) = test_bot();
        bot.modules().lock().await.load("announce").await.unwrap();
        platform.fail_next_send(PlatformError::Forbidden);

        bot.handle_event(PlatformEvent::MessageCreate(message(
            10,
            owner(),
            "!announce message=hi channel=77",
        )))
        .await;

        let sent = platform.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 10);
        assert_eq!(
            platform.sent_texts(),
            vec!["The bot does not have the required permissions to execute this command."]
        );
        assert_eq!(bot.metrics().errors_total(), 1);
    }
}
