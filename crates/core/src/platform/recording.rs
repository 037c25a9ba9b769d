//! In-memory adapter that records every call

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    ChannelId, InteractionId, MessageId, OutgoingMessage, Platform, PlatformError, PlatformEvent,
    PlatformResult, SlashCommandSpec, UserId,
};

/// Platform double for tests and cog development
///
/// Events are queued with [`push_event`](Self::push_event) and handed out in
/// order; once the queue is empty [`next_event`](Platform::next_event)
/// returns `None`, which ends [`Bot::run`](crate::Bot::run).
pub struct RecordingPlatform {
    owner: UserId,
    events: Mutex<VecDeque<PlatformEvent>>,
    sent: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
    deleted: Mutex<Vec<(ChannelId, MessageId)>>,
    responses: Mutex<Vec<(InteractionId, OutgoingMessage)>>,
    followups: Mutex<Vec<(InteractionId, OutgoingMessage)>>,
    synced: Mutex<Vec<SlashCommandSpec>>,
    send_failures: Mutex<VecDeque<PlatformError>>,
    responded: Mutex<HashSet<InteractionId>>,
    next_id: AtomicU64,
    shut_down: AtomicBool,
}

impl RecordingPlatform {
    /// Create an adapter whose application is owned by `owner`
    #[must_use]
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            events: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
            followups: Mutex::new(Vec::new()),
            synced: Mutex::new(Vec::new()),
            send_failures: Mutex::new(VecDeque::new()),
            responded: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1000),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Queue an event
    pub fn push_event(&self, event: PlatformEvent) {
        self.events.lock().push_back(event);
    }

    /// Make the next `send_message` fail with `error`
    pub fn fail_next_send(&self, error: PlatformError) {
        self.send_failures.lock().push_back(error);
    }

    /// Messages posted to channels
    pub fn sent(&self) -> Vec<(ChannelId, OutgoingMessage)> {
        self.sent.lock().clone()
    }

    /// Text of every channel message: content, else embed description
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .map(|(_, message)| describe(message))
            .collect()
    }

    /// Deleted messages
    pub fn deleted(&self) -> Vec<(ChannelId, MessageId)> {
        self.deleted.lock().clone()
    }

    /// Initial interaction responses
    pub fn responses(&self) -> Vec<(InteractionId, OutgoingMessage)> {
        self.responses.lock().clone()
    }

    /// Interaction followups
    pub fn followups(&self) -> Vec<(InteractionId, OutgoingMessage)> {
        self.followups.lock().clone()
    }

    /// Commands pushed by the last sync
    pub fn synced(&self) -> Vec<SlashCommandSpec> {
        self.synced.lock().clone()
    }

    /// Whether `shutdown` was called
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

fn describe(message: &OutgoingMessage) -> String {
    message
        .content
        .clone()
        .or_else(|| message.embed.as_ref().map(|e| e.description.clone()))
        .unwrap_or_default()
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> PlatformResult<MessageId> {
        if let Some(error) = self.send_failures.lock().pop_front() {
            return Err(error);
        }
        self.sent.lock().push((channel, message));
        Ok(self.next_id())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        self.deleted.lock().push((channel, message));
        Ok(())
    }

    async fn respond(
        &self,
        interaction: InteractionId,
        message: OutgoingMessage,
    ) -> PlatformResult<()> {
        if !self.responded.lock().insert(interaction) {
            return Err(PlatformError::AlreadyResponded);
        }
        self.responses.lock().push((interaction, message));
        Ok(())
    }

    async fn followup(
        &self,
        interaction: InteractionId,
        message: OutgoingMessage,
    ) -> PlatformResult<MessageId> {
        self.followups.lock().push((interaction, message));
        Ok(self.next_id())
    }

    async fn sync_commands(&self, commands: Vec<SlashCommandSpec>) -> PlatformResult<usize> {
        let count = commands.len();
        *self.synced.lock() = commands;
        Ok(count)
    }

    async fn next_event(&self) -> Option<PlatformEvent> {
        if self.is_shut_down() {
            return None;
        }
        self.events.lock().pop_front()
    }

    async fn application_owner(&self) -> PlatformResult<UserId> {
        Ok(self.owner)
    }

    async fn shutdown(&self) -> PlatformResult<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}
