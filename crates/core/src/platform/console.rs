//! Terminal adapter: stdin lines become messages, output goes to stdout

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{
    Author, ChannelId, Embed, Guild, IncomingMessage, Interaction, InteractionId,
    InteractionOption, MemberPermissions, MessageId, OutgoingMessage, Platform, PlatformEvent,
    PlatformResult, SlashCommandSpec, UserId,
};
use crate::kwargs;

const CONSOLE_ID: u64 = 1;

/// Drives the bot from a terminal
///
/// Every line typed is a message from an administrator who owns the single
/// console guild. Lines starting with `/` are slash command invocations whose
/// tail is parsed as keyword arguments, e.g. `/announce message="hi"`.
pub struct ConsolePlatform {
    lines: Mutex<Lines<BufReader<Stdin>>>,
    user: Author,
    guild: Guild,
    ready_sent: AtomicBool,
    closed: AtomicBool,
    next_id: AtomicU64,
}

impl ConsolePlatform {
    /// Create an adapter reading from the process stdin
    #[must_use]
    pub fn new() -> Self {
        let user = Author::new(CONSOLE_ID, "console").with_permissions(MemberPermissions {
            administrator: true,
            manage_guild: true,
            manage_messages: true,
        });
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            user,
            guild: Guild {
                id: CONSOLE_ID,
                name: "console".to_string(),
                owner_id: CONSOLE_ID,
            },
            ready_sent: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn parse_line(&self, line: &str) -> Option<PlatformEvent> {
        let id = self.next_id();

        if let Some(invocation) = line.strip_prefix('/') {
            let (command, tail) = invocation
                .split_once(' ')
                .unwrap_or((invocation, ""));
            let options = match kwargs::parse(tail) {
                Ok(options) => options,
                Err(e) => {
                    println!("{e}");
                    return None;
                }
            };
            return Some(PlatformEvent::InteractionCreate(Interaction {
                id,
                application_id: CONSOLE_ID,
                channel_id: CONSOLE_ID,
                guild: Some(self.guild.clone()),
                user: self.user.clone(),
                command: command.to_string(),
                options: options
                    .into_iter()
                    .map(|(name, value)| InteractionOption { name, value })
                    .collect(),
            }));
        }

        Some(PlatformEvent::MessageCreate(IncomingMessage {
            id,
            channel_id: CONSOLE_ID,
            guild: Some(self.guild.clone()),
            author: self.user.clone(),
            content: line.to_string(),
            timestamp: Utc::now(),
        }))
    }
}

impl Default for ConsolePlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn render(message: &OutgoingMessage) -> String {
    let mut out = Vec::new();
    if let Some(content) = &message.content {
        out.push(content.clone());
    }
    if let Some(embed) = &message.embed {
        out.push(render_embed(embed));
    }
    out.join("\n")
}

fn render_embed(embed: &Embed) -> String {
    let mut out = Vec::new();
    if let Some(title) = &embed.title {
        out.push(format!("┃ {title}"));
    }
    for line in embed.description.lines() {
        out.push(format!("┃ {line}"));
    }
    for field in &embed.fields {
        out.push(format!("┃ {}: {}", field.name, field.value));
    }
    if let Some(footer) = &embed.footer {
        out.push(format!("┃ ({})", footer.text));
    }
    out.join("\n")
}

#[async_trait]
impl Platform for ConsolePlatform {
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> PlatformResult<MessageId> {
        println!("[#{channel}]\n{}", render(&message));
        Ok(self.next_id())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        debug!(channel, message, "console message deleted");
        Ok(())
    }

    async fn respond(
        &self,
        interaction: InteractionId,
        message: OutgoingMessage,
    ) -> PlatformResult<()> {
        println!("[/{interaction}]\n{}", render(&message));
        Ok(())
    }

    async fn followup(
        &self,
        interaction: InteractionId,
        message: OutgoingMessage,
    ) -> PlatformResult<MessageId> {
        println!("[/{interaction} followup]\n{}", render(&message));
        Ok(self.next_id())
    }

    async fn sync_commands(&self, commands: Vec<SlashCommandSpec>) -> PlatformResult<usize> {
        for command in &commands {
            println!("/{} - {}", command.name, command.description);
        }
        Ok(commands.len())
    }

    async fn next_event(&self) -> Option<PlatformEvent> {
        if !self.ready_sent.swap(true, Ordering::SeqCst) {
            return Some(PlatformEvent::Ready);
        }

        let mut lines = self.lines.lock().await;
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(event) = self.parse_line(line) {
                        return Some(event);
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!("Failed to read from stdin: {}", e);
                    return None;
                }
            }
        }
    }

    async fn application_owner(&self) -> PlatformResult<UserId> {
        Ok(self.user.id)
    }

    async fn shutdown(&self) -> PlatformResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
