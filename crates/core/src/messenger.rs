//! Rate-limited sending helpers
//!
//! Every call goes through the [`RateLimiter`]. The `safe_*` helpers log
//! platform errors and turn them into `None`/`false`, so a command handler
//! can reply without caring whether the reply made it. [`Messenger::send`]
//! hands the error back for callers that must report it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::colors::Color;
use crate::platform::{
    Author, ChannelId, Embed, InteractionId, MessageId, OutgoingMessage, Platform, PlatformError,
    PlatformResult,
};
use crate::ratelimit::RateLimiter;

const SEND_ROUTE: &str = "POST /channels/{channel_id}/messages";
const DELETE_ROUTE: &str = "DELETE /channels/{channel_id}/messages/{message_id}";
const RESPOND_ROUTE: &str = "POST /interactions/{interaction_id}/callback";
const FOLLOWUP_ROUTE: &str = "POST /webhooks/{interaction_id}";

/// Where a command's reply goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    /// Reply in the channel of a text command
    Channel {
        /// Channel to post in
        channel_id: ChannelId,
        /// Who issued the command
        author: Author,
    },
    /// Reply to a slash command
    Interaction {
        /// Interaction to answer
        interaction_id: InteractionId,
        /// Who issued the command
        author: Author,
    },
}

impl ReplyTarget {
    /// Who issued the command
    pub fn author(&self) -> &Author {
        match self {
            Self::Channel { author, .. } | Self::Interaction { author, .. } => author,
        }
    }
}

/// Rate-limited, error-swallowing wrapper around a [`Platform`]
#[derive(Clone)]
pub struct Messenger {
    platform: Arc<dyn Platform>,
    limiter: Arc<RateLimiter>,
    delete_after: Duration,
}

impl Messenger {
    /// Create a messenger; `delete_after` applies to [`client`](Self::client)
    /// replies in channels
    pub fn new(platform: Arc<dyn Platform>, limiter: Arc<RateLimiter>, delete_after: Duration) -> Self {
        Self {
            platform,
            limiter,
            delete_after,
        }
    }

    /// Underlying platform
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// Rate limiter shared by every call
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Post a message to a channel, returning the platform error on failure
    ///
    /// If the message has `delete_after` set, its deletion is scheduled once
    /// it is posted.
    pub async fn send(&self, channel: ChannelId, message: OutgoingMessage) -> PlatformResult<MessageId> {
        let route = RateLimiter::route(SEND_ROUTE, channel);
        let delete_after = message.delete_after;
        let platform = &self.platform;

        let id = self
            .limiter
            .execute(&route, || platform.send_message(channel, message.clone()))
            .await?;

        info!("Message sent in {}", channel);
        if let Some(after) = delete_after {
            self.schedule_delete(channel, id, after);
        }
        Ok(id)
    }

    /// Post a message to a channel, logging any failure
    pub async fn safe_send(&self, channel: ChannelId, message: OutgoingMessage) -> Option<MessageId> {
        match self.send(channel, message).await {
            Ok(id) => Some(id),
            Err(PlatformError::Forbidden) => {
                error!("Bot has not the permission to send messages in {}", channel);
                None
            }
            Err(PlatformError::NotFound) => {
                error!("Channel {} not found", channel);
                None
            }
            Err(e) => {
                error!("Error when sending message: {}", e);
                None
            }
        }
    }

    /// Answer an interaction, falling back to a followup if it was already
    /// answered
    pub async fn safe_respond(&self, interaction: InteractionId, message: OutgoingMessage) -> bool {
        let route = RateLimiter::route(RESPOND_ROUTE, interaction);
        let platform = &self.platform;

        let result = self
            .limiter
            .execute(&route, || platform.respond(interaction, message.clone()))
            .await;

        match result {
            Ok(()) => true,
            Err(PlatformError::AlreadyResponded) => {
                debug!(interaction, "Interaction already answered, sending followup");
                self.followup(interaction, message).await.map_or_else(
                    |e| {
                        error!("Error in the followup: {}", e);
                        false
                    },
                    |_| true,
                )
            }
            Err(e) => {
                error!("Error when responding to the interaction: {}", e);
                false
            }
        }
    }

    /// Send an extra message after an interaction's first response
    pub async fn safe_followup(
        &self,
        interaction: InteractionId,
        message: OutgoingMessage,
    ) -> Option<MessageId> {
        match self.followup(interaction, message).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!("Error during the followup: {}", e);
                None
            }
        }
    }

    /// Delete a message, logging failures
    pub async fn delete(&self, channel: ChannelId, message: MessageId) -> bool {
        delete_message(&self.platform, &self.limiter, channel, message).await
    }

    /// Reply with an embed
    ///
    /// Channel replies get a footer naming the author and are deleted after
    /// the configured delay; interaction replies are ephemeral.
    pub async fn client(
        &self,
        target: &ReplyTarget,
        msg: &str,
        title: Option<&str>,
        color: Color,
    ) -> bool {
        let mut embed = Embed::new(msg, color);
        if let Some(title) = title {
            embed = embed.title(title);
        }

        match target {
            ReplyTarget::Channel { channel_id, author } => {
                let embed = embed.footer(
                    format!("Command issued by {}", author.display_name),
                    author.avatar_url.clone(),
                );
                let message = OutgoingMessage::embed(embed).delete_after(self.delete_after);
                self.safe_send(*channel_id, message).await.is_some()
            }
            ReplyTarget::Interaction { interaction_id, .. } => {
                let message = OutgoingMessage::embed(embed).ephemeral(true);
                self.safe_respond(*interaction_id, message).await
            }
        }
    }

    /// Log at info level and reply with a green embed
    pub async fn success(&self, target: &ReplyTarget, msg: &str) -> bool {
        info!("{}", msg);
        self.client(target, msg, Some(":white_check_mark: Success"), Color::GREEN)
            .await
    }

    /// Log at error level and reply with a red embed
    pub async fn failure(&self, target: &ReplyTarget, msg: &str) -> bool {
        error!("{}", msg);
        self.client(target, msg, Some(":x: Error"), Color::RED).await
    }

    async fn followup(
        &self,
        interaction: InteractionId,
        message: OutgoingMessage,
    ) -> Result<MessageId, PlatformError> {
        let route = RateLimiter::route(FOLLOWUP_ROUTE, interaction);
        let platform = &self.platform;
        self.limiter
            .execute(&route, || platform.followup(interaction, message.clone()))
            .await
    }

    fn schedule_delete(&self, channel: ChannelId, message: MessageId, after: Duration) {
        let platform = Arc::clone(&self.platform);
        let limiter = Arc::clone(&self.limiter);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            delete_message(&platform, &limiter, channel, message).await;
        });
    }
}

async fn delete_message(
    platform: &Arc<dyn Platform>,
    limiter: &RateLimiter,
    channel: ChannelId,
    message: MessageId,
) -> bool {
    let route = RateLimiter::route(DELETE_ROUTE, channel);
    match limiter
        .execute(&route, || platform.delete_message(channel, message))
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to delete message {} in {}: {}", message, channel, e);
            false
        }
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("delete_after", &self.delete_after)
            .finish_non_exhaustive()
    }
}
