//! Chat platform seam
//!
//! The gateway connection, REST calls and wire protocol belong to whatever
//! SDK talks to the actual chat service. The bot only sees the [`Platform`]
//! trait: a stream of [`PlatformEvent`]s in, and a handful of send/delete
//! calls out.
//!
//! Two adapters ship with the crate: [`ConsolePlatform`] drives the bot from a
//! terminal and [`RecordingPlatform`] keeps everything in memory for tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::colors::Color;

mod console;
mod recording;

pub use console::ConsolePlatform;
pub use recording::RecordingPlatform;

/// User identifier
pub type UserId = u64;
/// Channel identifier
pub type ChannelId = u64;
/// Guild (server) identifier
pub type GuildId = u64;
/// Message identifier
pub type MessageId = u64;
/// Interaction identifier
pub type InteractionId = u64;

/// Errors reported by a platform adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The bot is not allowed to do this
    #[error("forbidden")]
    Forbidden,

    /// Target channel, message or interaction does not exist
    #[error("not found")]
    NotFound,

    /// The interaction already received its initial response
    #[error("interaction already responded")]
    AlreadyResponded,

    /// The platform asked us to slow down
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// How long to wait before retrying
        retry_after: Duration,
    },

    /// Anything else the SDK reports
    #[error("{0}")]
    Other(String),
}

impl PlatformError {
    /// Check if the call may succeed when retried later
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Result of a platform call
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Guild-level permissions of a member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPermissions {
    /// Full administrator
    pub administrator: bool,
    /// May manage the guild
    pub manage_guild: bool,
    /// May delete other members' messages
    pub manage_messages: bool,
}

/// The user behind a message or interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// User ID
    pub id: UserId,
    /// Account name
    pub name: String,
    /// Name shown in the guild
    pub display_name: String,
    /// Avatar URL
    pub avatar_url: Option<String>,
    /// Whether the account is a bot
    pub bot: bool,
    /// Permissions in the current guild
    pub permissions: MemberPermissions,
}

impl Author {
    /// Create a regular user with no special permissions
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            avatar_url: None,
            bot: false,
            permissions: MemberPermissions::default(),
        }
    }

    /// Set guild permissions
    #[must_use]
    pub fn with_permissions(mut self, permissions: MemberPermissions) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Guild the event happened in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    /// Guild ID
    pub id: GuildId,
    /// Guild name
    pub name: String,
    /// Owner of the guild
    pub owner_id: UserId,
}

/// A text message seen by the bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Message ID
    pub id: MessageId,
    /// Channel it was posted in
    pub channel_id: ChannelId,
    /// Guild, `None` for direct messages
    pub guild: Option<Guild>,
    /// Sender
    pub author: Author,
    /// Raw text
    pub content: String,
    /// When it was posted
    pub timestamp: DateTime<Utc>,
}

/// A named option of a slash command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionOption {
    /// Option name
    pub name: String,
    /// Option value as text
    pub value: String,
}

/// A slash command invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction ID
    pub id: InteractionId,
    /// Application the command belongs to
    pub application_id: u64,
    /// Channel it was invoked in
    pub channel_id: ChannelId,
    /// Guild, `None` for direct messages
    pub guild: Option<Guild>,
    /// Invoking user
    pub user: Author,
    /// Invoked command name
    pub command: String,
    /// Supplied options
    pub options: Vec<InteractionOption>,
}

/// Footer line of an embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    /// Footer text
    pub text: String,
    /// Small icon next to the text
    pub icon_url: Option<String>,
}

/// A name/value block inside an embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    /// Field title
    pub name: String,
    /// Field body
    pub value: String,
    /// Render next to the previous field
    pub inline: bool,
}

/// Rich message card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    /// Title line
    pub title: Option<String>,
    /// Body text
    pub description: String,
    /// Side bar colour
    pub color: Color,
    /// Footer
    pub footer: Option<EmbedFooter>,
    /// Extra fields
    pub fields: Vec<EmbedField>,
}

impl Embed {
    /// Create an embed with a body and colour
    pub fn new(description: impl Into<String>, color: Color) -> Self {
        Self {
            description: description.into(),
            color,
            ..Self::default()
        }
    }

    /// Set the title
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the footer
    #[must_use]
    pub fn footer(mut self, text: impl Into<String>, icon_url: Option<String>) -> Self {
        self.footer = Some(EmbedFooter {
            text: text.into(),
            icon_url,
        });
        self
    }

    /// Append a field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// Something the bot sends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Plain text
    pub content: Option<String>,
    /// Embed card
    pub embed: Option<Embed>,
    /// Delete the message after this long
    #[serde(default, with = "humantime_serde")]
    pub delete_after: Option<Duration>,
    /// Only visible to the interaction's user
    pub ephemeral: bool,
}

impl OutgoingMessage {
    /// Plain text message
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Embed-only message
    #[must_use]
    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    /// Schedule deletion
    #[must_use]
    pub fn delete_after(mut self, after: Duration) -> Self {
        self.delete_after = Some(after);
        self
    }

    /// Mark as ephemeral
    #[must_use]
    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }
}

/// A slash command as pushed to the platform on sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommandSpec {
    /// Command name
    pub name: String,
    /// Command description
    pub description: String,
    /// Hidden from direct messages
    pub guild_only: bool,
}

/// Events delivered by the platform
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    /// Connection established and caches populated
    Ready,
    /// A text message was posted
    MessageCreate(IncomingMessage),
    /// A slash command was invoked
    InteractionCreate(Interaction),
}

/// The chat platform as seen by the bot
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Platform: Send + Sync {
    /// Post a message to a channel
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> PlatformResult<MessageId>;

    /// Delete a message
    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()>;

    /// Send the initial response to an interaction
    async fn respond(
        &self,
        interaction: InteractionId,
        message: OutgoingMessage,
    ) -> PlatformResult<()>;

    /// Send an additional message after the initial response
    async fn followup(
        &self,
        interaction: InteractionId,
        message: OutgoingMessage,
    ) -> PlatformResult<MessageId>;

    /// Replace the registered slash commands, returning how many were synced
    async fn sync_commands(&self, commands: Vec<SlashCommandSpec>) -> PlatformResult<usize>;

    /// Wait for the next event; `None` once the connection is closed
    async fn next_event(&self) -> Option<PlatformEvent>;

    /// Owner of the bot application
    async fn application_owner(&self) -> PlatformResult<UserId>;

    /// Close the connection
    async fn shutdown(&self) -> PlatformResult<()>;
}
