//! Bot orchestration
//!
//! The [`Bot`] ties the platform, the command router, the module manager and
//! the shared services together, and runs the event loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    builtin,
    cog::CogCatalog,
    commands::{Command, CommandRouter},
    config::BotConfig,
    context::{CommandContext, Origin},
    error::{Error, Result},
    events::BotEvents,
    messenger::{Messenger, ReplyTarget},
    modules::ModuleManager,
    platform::{IncomingMessage, Interaction, Platform, PlatformEvent, UserId},
    ratelimit::RateLimiter,
    store::ConfigStore,
};

const SYNC_ROUTE: &str = "PUT /applications/{application_id}/commands";

/// Services shared with cogs
///
/// Cheap to clone; every clone sees the same events, store and owner.
#[derive(Clone)]
pub struct BotHandle {
    config: Arc<BotConfig>,
    events: Arc<BotEvents>,
    store: Arc<ConfigStore>,
    messenger: Messenger,
    owner: Arc<RwLock<Option<UserId>>>,
}

impl BotHandle {
    /// Bot configuration
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Bot events
    pub fn events(&self) -> &BotEvents {
        &self.events
    }

    /// JSON config files
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Rate-limited sending helpers
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// Bot owner, once known
    pub fn owner_id(&self) -> Option<UserId> {
        *self.owner.read()
    }

    /// Whether `user` owns the bot
    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner_id() == Some(user)
    }

    /// Format a timestamp with the configured timezone and date format
    pub fn format_date<T: chrono::TimeZone>(&self, dt: &chrono::DateTime<T>) -> String {
        let zone = crate::time::parse_timezone(&self.config.timezone)
            .unwrap_or(chrono_tz::Tz::UTC);
        crate::time::format_date_with(dt, zone, &self.config.date_format)
    }

    fn set_owner(&self, owner: UserId) {
        *self.owner.write() = Some(owner);
    }
}

impl std::fmt::Debug for BotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotHandle")
            .field("config", &self.config)
            .field("owner", &self.owner_id())
            .finish_non_exhaustive()
    }
}

/// The running bot
///
/// The Bot coordinates between different components:
/// - Platform adapter for events and sending
/// - Command router for dispatch
/// - Module manager for cogs
/// - Shared services handed to cogs through [`BotHandle`]
#[derive(Clone)]
pub struct Bot {
    handle: BotHandle,
    platform: Arc<dyn Platform>,
    router: Arc<RwLock<CommandRouter>>,
    modules: Arc<Mutex<ModuleManager>>,
    metrics: Arc<BotMetrics>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Bot {
    /// Create a bot
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the built-in
    /// commands cannot be registered.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use dismob_core::{cogs, Bot, BotConfig, platform::RecordingPlatform};
    /// # fn example() -> anyhow::Result<()> {
    /// let platform = Arc::new(RecordingPlatform::new(1));
    /// let bot = Bot::new(BotConfig::default(), platform, cogs::catalog())?;
    /// assert!(bot.router().read().get("modules").is_some());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub fn new(
        config: BotConfig,
        platform: Arc<dyn Platform>,
        catalog: CogCatalog,
    ) -> anyhow::Result<Self> {
        info!("Initializing dismob v{}", crate::VERSION);

        config.validate().context("Invalid bot configuration")?;

        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let messenger = Messenger::new(Arc::clone(&platform), limiter, config.delete_after);
        let store = Arc::new(ConfigStore::new(config.config_dir.clone()));
        let owner = Arc::new(RwLock::new(config.owner_id));

        let handle = BotHandle {
            config: Arc::new(config),
            events: Arc::new(BotEvents::new()),
            store,
            messenger,
            owner,
        };

        let mut router = CommandRouter::new();
        router
            .register_all(builtin::commands(), None)
            .context("Failed to register built-in commands")?;
        let router = Arc::new(RwLock::new(router));

        let modules = ModuleManager::new(catalog, Arc::clone(&router), handle.clone());
        let (shutdown, _) = watch::channel(false);

        info!("Bot initialized successfully");
        Ok(Self {
            handle,
            platform,
            router,
            modules: Arc::new(Mutex::new(modules)),
            metrics: Arc::new(BotMetrics::new()),
            shutdown: Arc::new(shutdown),
        })
    }

    /// Run the event loop until the platform closes or
    /// [`shutdown`](Self::shutdown) is called, then clean up
    ///
    /// Events are handled one at a time in arrival order.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for adapters that fail on connect.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        info!("Event loop started");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            let event = tokio::select! {
                event = self.platform.next_event() => event,
                _ = shutdown.changed() => continue,
            };
            let Some(event) = event else {
                info!("Platform connection closed");
                break;
            };
            self.handle_event(event).await;
        }

        self.cleanup().await;
        Ok(())
    }

    /// Handle one platform event
    pub async fn handle_event(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::Ready => self.on_ready().await,
            PlatformEvent::MessageCreate(message) => self.handle_message(&message).await,
            PlatformEvent::InteractionCreate(interaction) => {
                self.handle_interaction(&interaction).await;
            }
        }
    }

    /// Ask the event loop to stop
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.send_replace(true);
    }

    /// Whether [`shutdown`](Self::shutdown) was called
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Push the slash commands to the platform
    ///
    /// # Errors
    ///
    /// Returns the platform error if the sync is rejected.
    pub async fn sync_commands(&self) -> Result<usize> {
        let specs = self.router.read().slash_specs();
        let platform = &self.platform;
        let count = self
            .handle
            .messenger()
            .limiter()
            .execute(SYNC_ROUTE, || platform.sync_commands(specs.clone()))
            .await?;
        info!("Synced {} slash command(s)", count);
        Ok(count)
    }

    /// Tear down live modules, persist the module list and close the
    /// platform connection
    pub async fn cleanup(&self) {
        info!("Final cleanup");
        {
            let mut modules = self.modules.lock().await;
            modules.teardown_all().await;
            modules.persist();
        }
        if let Err(e) = self.platform.shutdown().await {
            warn!("Failed to close the platform connection: {}", e);
        }
        info!("Bot has been shut off.");
    }

    /// Run a resolved command: checks, optional deletion of the invoking
    /// message, then the handler
    ///
    /// Errors are reported to the invoker before being returned.
    ///
    /// # Errors
    ///
    /// Returns the check or handler error.
    #[instrument(skip_all, fields(command = %ctx.command(), author = ctx.author().id))]
    pub async fn invoke(&self, command: &Command, ctx: CommandContext) -> Result<()> {
        let start = Instant::now();
        self.metrics.increment_commands();

        let result = self.run_command(command, &ctx).await;
        self.metrics.record_response_time(start.elapsed());

        match &result {
            Ok(()) => {
                self.metrics.increment_success();
                debug!("Command completed");
            }
            Err(e) => {
                self.metrics.increment_errors();
                warn!(code = e.error_code(), "Command `{}` failed: {}", ctx.command(), e);
                ctx.failure(&e.user_message()).await;
            }
        }
        result
    }

    /// Shared services
    pub fn handle(&self) -> &BotHandle {
        &self.handle
    }

    /// Bot configuration
    pub fn config(&self) -> &BotConfig {
        self.handle.config()
    }

    /// Platform adapter
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// Command router
    pub fn router(&self) -> &Arc<RwLock<CommandRouter>> {
        &self.router
    }

    /// Module manager
    pub fn modules(&self) -> &Arc<Mutex<ModuleManager>> {
        &self.modules
    }

    /// Metrics for monitoring
    pub fn metrics(&self) -> &BotMetrics {
        &self.metrics
    }

    async fn on_ready(&self) {
        if self.handle.owner_id().is_none() {
            match self.platform.application_owner().await {
                Ok(owner) => self.handle.set_owner(owner),
                Err(e) => warn!("Could not resolve the bot owner: {}", e),
            }
        }
        info!(owner = ?self.handle.owner_id(), "Logged in");

        let loaded = self.modules.lock().await.load_configured().await;
        debug!(?loaded, "Configured modules loaded");

        self.handle.events().on_ready.dispatch(&self.handle);
        info!("Bot is ready.");
    }

    async fn handle_message(&self, message: &IncomingMessage) {
        if message.author.bot {
            return;
        }
        let prefix = self.handle.config().prefix.as_str();
        let Some(body) = message.content.strip_prefix(prefix) else {
            return;
        };
        if body.trim().is_empty() {
            return;
        }

        let resolved = self.router.read().resolve(body);
        match resolved {
            Some(resolved) => {
                let ctx = CommandContext::from_message(
                    self.clone(),
                    message,
                    prefix,
                    &resolved.qualified_name,
                    &resolved.args,
                );
                let _ = self.invoke(&resolved.command, ctx).await;
            }
            None => {
                let name = body.split_whitespace().next().unwrap_or_default();
                let target = ReplyTarget::Channel {
                    channel_id: message.channel_id,
                    author: message.author.clone(),
                };
                self.report_unknown(name, &target).await;
            }
        }
    }

    async fn handle_interaction(&self, interaction: &Interaction) {
        let command = self.router.read().find_slash(&interaction.command).cloned();
        match command {
            Some(command) => {
                let ctx = CommandContext::from_interaction(self.clone(), interaction);
                let _ = self.invoke(&command, ctx).await;
            }
            None => {
                let target = ReplyTarget::Interaction {
                    interaction_id: interaction.id,
                    author: interaction.user.clone(),
                };
                self.report_unknown(&interaction.command, &target).await;
            }
        }
    }

    async fn report_unknown(&self, name: &str, target: &ReplyTarget) {
        self.metrics.increment_commands();
        self.metrics.increment_errors();
        let error = Error::CommandNotFound(name.to_string());
        debug!("{}", error);
        self.handle
            .messenger()
            .failure(target, &error.user_message())
            .await;
    }

    async fn run_command(&self, command: &Command, ctx: &CommandContext) -> Result<()> {
        command.run_checks(ctx)?;

        if command.is_suppressed() {
            match ctx.origin() {
                Origin::Message { message_id } => {
                    if !self.handle.messenger().delete(ctx.channel_id(), message_id).await {
                        warn!("Failed to delete member message");
                    }
                }
                Origin::Interaction { .. } => {
                    debug!("No message to delete for a slash command");
                }
            }
        }

        let handler = command
            .handler()
            .ok_or_else(|| Error::CommandNotFound(ctx.command().to_string()))?;
        let outcome = handler(ctx.clone()).await;
        if let Err(e) = &outcome {
            if !e.is_user_error() {
                error!(code = e.error_code(), "Unexpected error in `{}`: {}", ctx.command(), e);
            }
        }
        outcome
    }
}

/// Builder for creating Bot instances
pub struct BotBuilder {
    config: BotConfig,
    platform: Option<Arc<dyn Platform>>,
    catalog: CogCatalog,
}

impl BotBuilder {
    /// Create a new builder with default configuration and the bundled cogs
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: BotConfig::default(),
            platform: None,
            catalog: crate::cogs::catalog(),
        }
    }

    /// Set the bot configuration
    #[must_use]
    pub fn config(mut self, config: BotConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the platform adapter
    #[must_use]
    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Replace the module catalog
    #[must_use]
    pub fn catalog(mut self, catalog: CogCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Build the Bot instance
    ///
    /// # Errors
    ///
    /// Returns an error if no platform was set or bot creation fails.
    pub fn build(self) -> anyhow::Result<Bot> {
        let platform = self.platform.context("platform is required")?;
        Bot::new(self.config, platform, self.catalog)
    }
}

impl Default for BotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics for monitoring bot performance
#[derive(Debug)]
pub struct BotMetrics {
    commands_total: Arc<RwLock<u64>>,
    success_total: Arc<RwLock<u64>>,
    errors_total: Arc<RwLock<u64>>,
    response_times: Arc<RwLock<Vec<Duration>>>,
}

impl BotMetrics {
    fn new() -> Self {
        Self {
            commands_total: Arc::new(RwLock::new(0)),
            success_total: Arc::new(RwLock::new(0)),
            errors_total: Arc::new(RwLock::new(0)),
            response_times: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn increment_commands(&self) {
        *self.commands_total.write() += 1;
    }

    fn increment_success(&self) {
        *self.success_total.write() += 1;
    }

    fn increment_errors(&self) {
        *self.errors_total.write() += 1;
    }

    fn record_response_time(&self, duration: Duration) {
        let mut times = self.response_times.write();
        times.push(duration);
        // Keep only last 1000 response times
        if times.len() > 1000 {
            times.remove(0);
        }
    }

    /// Get the total number of commands invoked
    #[must_use]
    pub fn commands_total(&self) -> u64 {
        *self.commands_total.read()
    }

    /// Get the total number of successful commands
    #[must_use]
    pub fn success_total(&self) -> u64 {
        *self.success_total.read()
    }

    /// Get the total number of failed commands
    #[must_use]
    pub fn errors_total(&self) -> u64 {
        *self.errors_total.read()
    }

    /// Get the average command duration
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn average_response_time(&self) -> Option<Duration> {
        let times = self.response_times.read();
        if times.is_empty() {
            return None;
        }

        let total: Duration = times.iter().sum();
        Some(total / times.len() as u32)
    }

    /// Get the success rate as a percentage
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let commands = self.commands_total();
        if commands == 0 {
            return 100.0;
        }

        let success = self.success_total();
        (success as f64 / commands as f64) * 100.0
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{message, owner, test_bot, test_bot_with, OWNER};
    use super::*;
    use crate::platform::{Author, InteractionOption, MemberPermissions, RecordingPlatform};

    fn embed_titles(platform: &RecordingPlatform) -> Vec<String> {
        platform
            .sent()
            .iter()
            .filter_map(|(_, m)| m.embed.as_ref().and_then(|e| e.title.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_bot_creation() {
        let (bot, _platform, _dir) = test_bot();
        assert!(bot.router().read().get("help").is_some());
        assert!(bot.handle().is_owner(OWNER));
        assert!(!bot.is_shutting_down());
    }

    #[tokio::test]
    async fn test_dates_use_configured_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig::builder()
            .config_dir(dir.path())
            .timezone("Europe/Paris")
            .date_format("%d/%m/%Y %H:%M")
            .build()
            .unwrap();
        let bot = Bot::new(config, Arc::new(RecordingPlatform::new(OWNER)), CogCatalog::new())
            .unwrap();

        let dt = crate::time::parse_date("2024-07-01T10:00:00Z").unwrap();
        assert_eq!(bot.handle().format_date(&dt), "01/07/2024 12:00");
    }

    #[tokio::test]
    async fn test_bot_builder() {
        let platform = Arc::new(RecordingPlatform::new(1));
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig::builder().config_dir(dir.path()).build().unwrap();
        let bot = BotBuilder::new().config(config).platform(platform).build();
        assert!(bot.is_ok());

        assert!(BotBuilder::new().build().is_err());
    }

    #[tokio::test]
    async fn test_load_module_then_use_it() {
        let (bot, platform, _dir) = test_bot();
        platform.push_event(PlatformEvent::Ready);
        platform.push_event(PlatformEvent::MessageCreate(message(10, owner(), "!modules load ping")));
        platform.push_event(PlatformEvent::MessageCreate(message(11, owner(), "!ping")));

        bot.run().await.unwrap();

        let texts = platform.sent_texts();
        assert!(texts.contains(&":white_check_mark: Module `ping` successfully loaded.\n".to_string()));
        assert!(texts.contains(&"pong".to_string()));
        assert_eq!(bot.metrics().success_total(), 2);
        assert!(platform.is_shut_down());
    }

    #[tokio::test]
    async fn test_configured_modules_load_on_ready() {
        let (bot, platform, dir) = test_bot();
        std::fs::write(dir.path().join("config.json"), r#"{"modules": ["ping"]}"#).unwrap();
        // Re-create so the manager reads the file
        let bot = Bot::new(bot.config().clone(), platform.clone(), crate::cogs::catalog()).unwrap();

        let ready = Arc::new(parking_lot::Mutex::new(0));
        let counter = ready.clone();
        bot.handle()
            .events()
            .on_ready
            .register(Arc::new(move |_: &BotHandle| *counter.lock() += 1));

        bot.handle_event(PlatformEvent::Ready).await;
        assert!(bot.modules().lock().await.is_active("ping"));
        assert_eq!(*ready.lock(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (bot, platform, _dir) = test_bot();
        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "!nope arg")))
            .await;

        assert_eq!(platform.sent_texts(), vec!["This command does not exist."]);
        assert_eq!(embed_titles(&platform), vec![":x: Error"]);
        assert_eq!(bot.metrics().errors_total(), 1);
    }

    #[tokio::test]
    async fn test_ignored_messages() {
        let (bot, platform, _dir) = test_bot();
        let mut from_bot = message(10, owner(), "!help");
        from_bot.author.bot = true;
        bot.handle_event(PlatformEvent::MessageCreate(from_bot)).await;
        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "hello")))
            .await;
        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "!  ")))
            .await;

        assert!(platform.sent().is_empty());
        assert_eq!(bot.metrics().commands_total(), 0);
    }

    #[tokio::test]
    async fn test_check_failure_is_reported() {
        let (bot, platform, _dir) = test_bot();
        let stranger = Author::new(2, "bob");
        bot.handle_event(PlatformEvent::MessageCreate(message(10, stranger, "!sync")))
            .await;

        assert_eq!(platform.sent_texts(), vec!["A check failed in the command."]);
        assert!(platform.deleted().is_empty());
        assert!(platform.synced().is_empty());
    }

    #[tokio::test]
    async fn test_administrator_manages_modules_but_cannot_sync() {
        let (bot, platform, _dir) = test_bot();
        let admin = Author::new(2, "admin").with_permissions(MemberPermissions {
            administrator: true,
            ..MemberPermissions::default()
        });

        bot.handle_event(PlatformEvent::MessageCreate(message(
            10,
            admin.clone(),
            "!modules load announce",
        )))
        .await;
        bot.handle_event(PlatformEvent::MessageCreate(message(10, admin, "!sync")))
            .await;

        assert_eq!(
            platform.sent_texts(),
            vec![
                ":white_check_mark: Module `announce` successfully loaded.\n",
                "A check failed in the command.",
            ]
        );
        assert!(bot.modules().lock().await.is_active("announce"));
        assert!(platform.synced().is_empty());
    }

    #[tokio::test]
    async fn test_guild_only_command_in_direct_message() {
        let (bot, platform, _dir) = test_bot();
        bot.modules().lock().await.load("announce").await.unwrap();

        let mut msg = message(10, owner(), "!announce message=hi");
        msg.guild = None;
        bot.handle_event(PlatformEvent::MessageCreate(msg)).await;

        assert_eq!(platform.sent_texts(), vec!["A check failed in the command."]);
        assert!(platform.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_sync_deletes_invoking_message() {
        let (bot, platform, _dir) = test_bot();
        bot.modules().lock().await.load("announce").await.unwrap();

        let msg = message(10, owner(), "!sync");
        let id = msg.id;
        bot.handle_event(PlatformEvent::MessageCreate(msg)).await;

        assert_eq!(platform.deleted(), vec![(10, id)]);
        assert_eq!(platform.synced().len(), 1);
        assert_eq!(platform.synced()[0].name, "announce");
        assert_eq!(embed_titles(&platform), vec![":white_check_mark: Success"]);
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_loop() {
        let (bot, platform, _dir) = test_bot();
        platform.push_event(PlatformEvent::MessageCreate(message(10, owner(), "!shutdown")));
        platform.push_event(PlatformEvent::MessageCreate(message(11, owner(), "!help")));

        bot.run().await.unwrap();

        assert!(bot.is_shutting_down());
        assert!(platform.is_shut_down());
        assert_eq!(platform.sent_texts(), vec!["Shutting down bot..."]);
    }

    #[tokio::test]
    async fn test_modules_without_names() {
        let (bot, platform, _dir) = test_bot();
        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "!mod load")))
            .await;
        assert_eq!(
            platform.sent_texts(),
            vec!["You must provide at least one module name to load."]
        );
    }

    #[tokio::test]
    async fn test_modules_status_and_list() {
        let (bot, platform, _dir) = test_bot();
        bot.modules().lock().await.load("ping").await.unwrap();

        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "!modules ls")))
            .await;
        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "!modules s ping")))
            .await;
        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "!modules status")))
            .await;

        let texts = platform.sent_texts();
        assert_eq!(texts[0], "There are 2 available modules:\nannounce, ping");
        assert_eq!(texts[1], "`ping` module status: active :white_check_mark:");
        assert_eq!(
            texts[2],
            "All modules (2):\n- `announce` (status: inactive :x:)\n- `ping` (status: active :white_check_mark:)\n"
        );
    }

    #[tokio::test]
    async fn test_help() {
        let (bot, platform, _dir) = test_bot();
        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "!help")))
            .await;
        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "!help plugins load")))
            .await;
        bot.handle_event(PlatformEvent::MessageCreate(message(10, owner(), "!help nothing")))
            .await;

        let texts = platform.sent_texts();
        assert!(texts[0].contains("`!modules|mod|plugins` Manages modules of the bot"));
        assert!(texts[0].contains("  `!modules reload|rl|r`"));
        assert!(texts[1].starts_with("`!modules load|l|enable|activate`"));
        assert_eq!(texts[2], "No command called \"nothing\" found.");
        assert_eq!(embed_titles(&platform), vec!["Help", "Help", "Error"]);
    }

    #[tokio::test]
    async fn test_slash_command() {
        let (bot, platform, _dir) = test_bot();
        bot.modules().lock().await.load("announce").await.unwrap();

        let interaction = Interaction {
            id: 42,
            application_id: 3,
            channel_id: 10,
            guild: Some(crate::platform::Guild {
                id: 9,
                name: "test guild".to_string(),
                owner_id: OWNER,
            }),
            user: owner(),
            command: "announce".to_string(),
            options: vec![InteractionOption {
                name: "message".to_string(),
                value: "Server restart at 8".to_string(),
            }],
        };
        bot.handle_event(PlatformEvent::InteractionCreate(interaction))
            .await;

        assert_eq!(platform.sent_texts(), vec!["Server restart at 8"]);
        assert_eq!(platform.responses().len(), 1);
        assert!(platform.responses()[0].1.ephemeral);
    }

    #[tokio::test]
    async fn test_unknown_slash_command() {
        let (bot, platform, _dir) = test_bot();
        let interaction = Interaction {
            id: 42,
            application_id: 3,
            channel_id: 10,
            guild: None,
            user: owner(),
            command: "ghost".to_string(),
            options: Vec::new(),
        };
        bot.handle_event(PlatformEvent::InteractionCreate(interaction))
            .await;

        let responses = platform.responses();
        let embed = responses[0].1.embed.as_ref().unwrap();
        assert_eq!(embed.description, "This command does not exist.");
    }

    #[tokio::test]
    async fn test_cleanup_persists_modules() {
        let (bot, _platform, dir) = test_bot_with(crate::cogs::catalog());
        bot.modules().lock().await.load("ping").await.unwrap();
        bot.cleanup().await;

        let text = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(text.contains("\"ping\""));
        assert!(!bot.modules().lock().await.is_active("ping"));
    }

    #[test]
    fn test_metrics() {
        let metrics = BotMetrics::new();

        assert_eq!(metrics.commands_total(), 0);
        assert_eq!(metrics.success_total(), 0);
        assert_eq!(metrics.errors_total(), 0);
        assert_eq!(metrics.success_rate(), 100.0);

        metrics.increment_commands();
        metrics.increment_success();
        assert_eq!(metrics.commands_total(), 1);
        assert_eq!(metrics.success_total(), 1);
        assert_eq!(metrics.success_rate(), 100.0);

        metrics.increment_commands();
        metrics.increment_errors();
        assert_eq!(metrics.commands_total(), 2);
        assert_eq!(metrics.errors_total(), 1);
        assert_eq!(metrics.success_rate(), 50.0);
    }

    #[test]
    fn test_metrics_response_time() {
        let metrics = BotMetrics::new();

        assert!(metrics.average_response_time().is_none());

        metrics.record_response_time(Duration::from_millis(100));
        metrics.record_response_time(Duration::from_millis(200));

        let avg = metrics.average_response_time().unwrap();
        assert_eq!(avg, Duration::from_millis(150));
    }

    #[cfg(feature = "property-testing")]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_metrics_success_rate_bounds(
                commands in 0u64..1000,
                success in 0u64..1000
            ) {
                let metrics = BotMetrics::new();

                for _ in 0..commands {
                    metrics.increment_commands();
                }

                for _ in 0..success.min(commands) {
                    metrics.increment_success();
                }

                let rate = metrics.success_rate();
                prop_assert!(rate >= 0.0);
                prop_assert!(rate <= 100.0);
            }
        }
    }
}
