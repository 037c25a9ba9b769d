//! Per-invocation command context
//!
//! A [`CommandContext`] is built for every text or slash command invocation
//! and handed to the command's handler by value. It knows who invoked the
//! command, where, and how to answer.

use tracing::instrument;

use crate::bot::{Bot, BotHandle};
use crate::error::Result;
use crate::kwargs::{self, Kwargs};
use crate::messenger::ReplyTarget;
use crate::platform::{
    Author, ChannelId, Guild, IncomingMessage, Interaction, InteractionId, MessageId,
    OutgoingMessage,
};

/// How the command was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Prefixed text message
    Message {
        /// The invoking message
        message_id: MessageId,
    },
    /// Slash command
    Interaction {
        /// The interaction to answer
        interaction_id: InteractionId,
        /// Application the command belongs to
        application_id: u64,
    },
}

/// Everything a handler needs about one invocation
#[derive(Clone)]
pub struct CommandContext {
    bot: Bot,
    author: Author,
    channel_id: ChannelId,
    guild: Option<Guild>,
    origin: Origin,
    command: String,
    prefix: String,
    raw_args: String,
    options: Option<Kwargs>,
}

impl CommandContext {
    /// Context for a prefixed text command
    ///
    /// `command` is the qualified command name and `args` the text after it.
    pub fn from_message(
        bot: Bot,
        message: &IncomingMessage,
        prefix: &str,
        command: &str,
        args: &str,
    ) -> Self {
        Self {
            bot,
            author: message.author.clone(),
            channel_id: message.channel_id,
            guild: message.guild.clone(),
            origin: Origin::Message {
                message_id: message.id,
            },
            command: command.to_string(),
            prefix: prefix.to_string(),
            raw_args: args.to_string(),
            options: None,
        }
    }

    /// Context for a slash command
    ///
    /// The interaction's options become the keyword arguments as-is; the raw
    /// argument text is their `key="value"` rendering.
    pub fn from_interaction(bot: Bot, interaction: &Interaction) -> Self {
        let options: Kwargs = interaction
            .options
            .iter()
            .map(|o| (o.name.as_str(), o.value.as_str()))
            .collect();
        Self {
            bot,
            author: interaction.user.clone(),
            channel_id: interaction.channel_id,
            guild: interaction.guild.clone(),
            origin: Origin::Interaction {
                interaction_id: interaction.id,
                application_id: interaction.application_id,
            },
            command: interaction.command.clone(),
            prefix: "/".to_string(),
            raw_args: options.to_quoted_string(),
            options: Some(options),
        }
    }

    /// The running bot
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// The bot's shared services
    pub fn handle(&self) -> &BotHandle {
        self.bot.handle()
    }

    /// Invoking user
    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Channel of the invocation
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Guild of the invocation, `None` in direct messages
    pub fn guild(&self) -> Option<&Guild> {
        self.guild.as_ref()
    }

    /// Text or slash origin
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Whether this is a slash command
    pub fn is_interaction(&self) -> bool {
        matches!(self.origin, Origin::Interaction { .. })
    }

    /// Qualified command name, e.g. `modules load`
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Prefix used, `/` for slash commands
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Argument text after the command name
    pub fn raw_args(&self) -> &str {
        &self.raw_args
    }

    /// Whitespace-separated arguments
    pub fn args(&self) -> Vec<&str> {
        self.raw_args.split_whitespace().collect()
    }

    /// Keyword arguments
    ///
    /// # Errors
    ///
    /// Returns `Error::Kwargs` when the argument text is malformed; its
    /// message carries the caret diagram shown to the user.
    pub fn kwargs(&self) -> Result<Kwargs> {
        match &self.options {
            Some(options) => Ok(options.clone()),
            None => Ok(kwargs::parse(&self.raw_args)?),
        }
    }

    /// Where replies go
    pub fn reply_target(&self) -> ReplyTarget {
        match self.origin {
            Origin::Message { .. } => ReplyTarget::Channel {
                channel_id: self.channel_id,
                author: self.author.clone(),
            },
            Origin::Interaction { interaction_id, .. } => ReplyTarget::Interaction {
                interaction_id,
                author: self.author.clone(),
            },
        }
    }

    /// Send a plain message back
    pub async fn reply(&self, content: impl Into<String>) -> bool {
        self.send(OutgoingMessage::text(content)).await
    }

    /// Send a message back: in the channel, or as the interaction response
    #[instrument(skip(self, message), fields(command = %self.command))]
    pub async fn send(&self, message: OutgoingMessage) -> bool {
        let messenger = self.handle().messenger();
        match self.origin {
            Origin::Message { .. } => messenger.safe_send(self.channel_id, message).await.is_some(),
            Origin::Interaction { interaction_id, .. } => {
                messenger.safe_respond(interaction_id, message).await
            }
        }
    }

    /// Reply with a neutral embed
    pub async fn client(&self, msg: &str) -> bool {
        self.handle()
            .messenger()
            .client(&self.reply_target(), msg, None, crate::colors::Color::BLURPLE)
            .await
    }

    /// Reply with a success embed
    pub async fn success(&self, msg: &str) -> bool {
        self.handle()
            .messenger()
            .success(&self.reply_target(), msg)
            .await
    }

    /// Reply with a failure embed
    pub async fn failure(&self, msg: &str) -> bool {
        self.handle()
            .messenger()
            .failure(&self.reply_target(), msg)
            .await
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("author", &self.author.name)
            .field("channel_id", &self.channel_id)
            .field("origin", &self.origin)
            .field("command", &self.command)
            .field("raw_args", &self.raw_args)
            .finish_non_exhaustive()
    }
}
