//! Module lifecycle
//!
//! The [`ModuleManager`] turns catalog entries into live cogs and back, keeps
//! the router in sync with the live set, and persists the list of active
//! modules under the `"modules"` key of `config.json` so they come back on
//! the next start.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::bot::BotHandle;
use crate::cog::{Cog, CogCatalog};
use crate::commands::CommandRouter;

const MODULES_KEY: &str = "modules";

/// Why a module operation did not happen
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// The module is already live
    #[error("Module `{0}` is already loaded")]
    AlreadyLoaded(String),

    /// The module exists but is not live
    #[error("Module `{0}` is not loaded")]
    NotLoaded(String),

    /// No such module in the catalog
    #[error("Module `{0}` does not exist")]
    NotFound(String),

    /// Setup, teardown or command registration failed
    #[error("Module `{name}` failed: {reason}")]
    Failed {
        /// Module name
        name: String,
        /// What went wrong
        reason: String,
    },
}

/// A module operation, used to word reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOp {
    /// Load
    Load,
    /// Unload
    Unload,
    /// Reload
    Reload,
}

impl ModuleOp {
    /// Verb used in messages
    pub fn verb(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Unload => "unload",
            Self::Reload => "reload",
        }
    }

    /// One report line for a module
    pub fn report(self, name: &str, result: &Result<(), ModuleError>) -> String {
        match (self, result) {
            (Self::Load, Ok(())) => {
                format!(":white_check_mark: Module `{name}` successfully loaded.")
            }
            (Self::Unload, Ok(())) => {
                format!(":white_check_mark: Module `{name}` successfully unloaded.")
            }
            (Self::Reload, Ok(())) => {
                format!(":white_check_mark: Module `{name}` successfully reloaded.")
            }
            (Self::Load, Err(ModuleError::AlreadyLoaded(_))) => {
                format!(":white_check_mark: Module `{name}` is already loaded")
            }
            (Self::Unload, Err(ModuleError::NotLoaded(_))) => {
                format!(":white_check_mark: Module `{name}` is already unloaded")
            }
            (_, Err(ModuleError::NotLoaded(_))) => format!(":x: Module `{name}` is not loaded"),
            (_, Err(ModuleError::NotFound(_))) => format!(":x: Module `{name}` does not exists"),
            (op, Err(ModuleError::Failed { reason, .. })) => {
                format!(":x: Failed to {} module `{name}`: `{reason}`", op.verb())
            }
            (op, Err(e)) => format!(":x: Failed to {} module `{name}`: `{e}`", op.verb()),
        }
    }
}

/// Owns the live cogs and the persisted active list
pub struct ModuleManager {
    catalog: CogCatalog,
    loaded: BTreeMap<String, Box<dyn Cog>>,
    active: Vec<String>,
    router: Arc<RwLock<CommandRouter>>,
    handle: BotHandle,
}

impl ModuleManager {
    /// Create a manager; the active list is read from `config.json`
    pub fn new(catalog: CogCatalog, router: Arc<RwLock<CommandRouter>>, handle: BotHandle) -> Self {
        let active = read_active(&handle);
        info!(
            available = catalog.len(),
            configured = active.len(),
            "Module manager ready"
        );
        Self {
            catalog,
            loaded: BTreeMap::new(),
            active,
            router,
            handle,
        }
    }

    /// Load a module and add it to the active list
    ///
    /// # Errors
    ///
    /// `AlreadyLoaded`, `NotFound` or `Failed` if setup or command
    /// registration fails.
    #[instrument(skip(self))]
    pub async fn load(&mut self, name: &str) -> Result<(), ModuleError> {
        if self.loaded.contains_key(name) {
            return Err(ModuleError::AlreadyLoaded(name.to_string()));
        }
        let cog = self
            .catalog
            .create(name)
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;
        self.activate(name, cog).await?;

        if !self.active.iter().any(|m| m == name) {
            self.active.push(name.to_string());
        }
        self.persist();
        self.handle.events().on_module_loaded.dispatch(&name.to_string());
        Ok(())
    }

    /// Unload a module and drop it from the active list
    ///
    /// A failing teardown is reported but the module ends up unloaded.
    ///
    /// # Errors
    ///
    /// `NotLoaded`, `NotFound`, or `Failed` if teardown fails.
    #[instrument(skip(self))]
    pub async fn unload(&mut self, name: &str) -> Result<(), ModuleError> {
        self.ensure_loaded(name)?;
        let result = self.deactivate(name).await;

        self.active.retain(|m| m != name);
        self.persist();
        self.handle
            .events()
            .on_module_unloaded
            .dispatch(&name.to_string());
        result
    }

    /// Replace a live module with a fresh instance
    ///
    /// The active list is left untouched. If the fresh instance fails to set
    /// up, the module stays unloaded until loaded again.
    ///
    /// # Errors
    ///
    /// `NotLoaded`, `NotFound`, or `Failed`.
    #[instrument(skip(self))]
    pub async fn reload(&mut self, name: &str) -> Result<(), ModuleError> {
        self.ensure_loaded(name)?;
        let fresh = self
            .catalog
            .create(name)
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;

        if let Err(e) = self.deactivate(name).await {
            warn!("Teardown of `{}` failed during reload: {}", name, e);
        }
        self.activate(name, fresh).await
    }

    /// Load every module of the active list, highest priority first
    ///
    /// Failures are logged and skipped. Returns the loaded names in load
    /// order.
    pub async fn load_configured(&mut self) -> Vec<String> {
        let mut pending: Vec<(String, Box<dyn Cog>)> = Vec::new();
        for name in self.active.clone() {
            if self.loaded.contains_key(&name) {
                continue;
            }
            match self.catalog.create(&name) {
                Some(cog) => pending.push((name, cog)),
                None => error!(
                    "Failed to load module `{}`: {}",
                    name,
                    ModuleError::NotFound(name.clone())
                ),
            }
        }
        pending.sort_by_key(|(_, cog)| Reverse(cog.priority()));

        let mut loaded = Vec::new();
        for (name, cog) in pending {
            match self.activate(&name, cog).await {
                Ok(()) => {
                    info!("Module `{}` successfully loaded.", name);
                    self.handle.events().on_module_loaded.dispatch(&name);
                    loaded.push(name);
                }
                Err(e) => error!("Failed to load module `{}`: {}", name, e),
            }
        }
        loaded
    }

    /// Tear down every live module without touching the active list
    pub async fn teardown_all(&mut self) {
        let names: Vec<String> = self.loaded.keys().cloned().collect();
        for name in names {
            if let Err(e) = self.deactivate(&name).await {
                warn!("{}", e);
            }
        }
    }

    /// Whether a module is live
    pub fn is_active(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Status shown by `modules status`
    pub fn status_label(&self, name: &str) -> &'static str {
        if self.is_active(name) {
            "active :white_check_mark:"
        } else {
            "inactive :x:"
        }
    }

    /// Every module in the catalog, sorted
    pub fn available(&self) -> Vec<String> {
        self.catalog.names()
    }

    /// Live modules, sorted
    pub fn loaded(&self) -> Vec<String> {
        self.loaded.keys().cloned().collect()
    }

    /// Persisted active list, in configured order
    pub fn configured(&self) -> &[String] {
        &self.active
    }

    /// Description of a module from the catalog
    pub fn describe(&self, name: &str) -> Option<String> {
        if let Some(cog) = self.loaded.get(name) {
            return Some(cog.description().to_string());
        }
        self.catalog
            .create(name)
            .map(|cog| cog.description().to_string())
    }

    /// Write the active list to `config.json`, keeping its other keys
    pub fn persist(&self) {
        let store = self.handle.store();
        let mut config = store.open(None);
        config.insert(
            MODULES_KEY.to_string(),
            Value::Array(self.active.iter().cloned().map(Value::String).collect()),
        );
        if let Err(e) = store.save(None, &config) {
            error!("Failed to save the module list: {}", e);
        }
    }

    fn ensure_loaded(&self, name: &str) -> Result<(), ModuleError> {
        if self.loaded.contains_key(name) {
            Ok(())
        } else if self.catalog.contains(name) {
            Err(ModuleError::NotLoaded(name.to_string()))
        } else {
            Err(ModuleError::NotFound(name.to_string()))
        }
    }

    async fn activate(&mut self, name: &str, mut cog: Box<dyn Cog>) -> Result<(), ModuleError> {
        info!("Module `{}` setup", name);
        cog.setup(&self.handle)
            .await
            .map_err(|e| ModuleError::Failed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let registered = self.router.write().register_all(cog.commands(), Some(name));
        if let Err(e) = registered {
            if let Err(teardown) = cog.teardown(&self.handle).await {
                warn!("Teardown of `{}` failed: {}", name, teardown);
            }
            return Err(ModuleError::Failed {
                name: name.to_string(),
                reason: e.to_string(),
            });
        }

        self.loaded.insert(name.to_string(), cog);
        Ok(())
    }

    async fn deactivate(&mut self, name: &str) -> Result<(), ModuleError> {
        let Some(mut cog) = self.loaded.remove(name) else {
            return Err(ModuleError::NotLoaded(name.to_string()));
        };
        self.router.write().remove_cog(name);

        info!("Module `{}` teardown", name);
        cog.teardown(&self.handle)
            .await
            .map_err(|e| ModuleError::Failed {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

fn read_active(handle: &BotHandle) -> Vec<String> {
    match handle.store().open(None).get(MODULES_KEY) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(other) => {
            warn!("Ignoring malformed `{}` entry in config: {}", MODULES_KEY, other);
            Vec::new()
        }
        None => Vec::new(),
    }
}

impl std::fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleManager")
            .field("available", &self.catalog.names())
            .field("loaded", &self.loaded())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::test_bot_with;
    use crate::commands::Command;
    use crate::context::CommandContext;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    async fn noop(_ctx: CommandContext) -> Result<()> {
        Ok(())
    }

    struct TestCog {
        name: &'static str,
        command: &'static str,
        priority: i32,
        fail_setup: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Cog for TestCog {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn commands(&self) -> Vec<Command> {
            vec![Command::new(self.command, noop)]
        }

        async fn setup(&mut self, _bot: &BotHandle) -> Result<()> {
            if self.fail_setup {
                return Err(Error::new("boom"));
            }
            self.log.lock().push(format!("setup {}", self.name));
            Ok(())
        }

        async fn teardown(&mut self, _bot: &BotHandle) -> Result<()> {
            self.log.lock().push(format!("teardown {}", self.name));
            Ok(())
        }
    }

    fn catalog(log: &Arc<Mutex<Vec<String>>>) -> CogCatalog {
        let mut catalog = CogCatalog::new();
        for (name, command, priority, fail_setup) in [
            ("alpha", "a", 0, false),
            ("beta", "b", 10, false),
            ("broken", "x", 0, true),
            ("clash", "a", 0, false),
        ] {
            let log = log.clone();
            catalog.register(name, move || {
                Box::new(TestCog {
                    name,
                    command,
                    priority,
                    fail_setup,
                    log: log.clone(),
                })
            });
        }
        catalog
    }

    #[tokio::test]
    async fn test_load_unload_cycle() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (bot, _platform, _dir) = test_bot_with(catalog(&log));
        let mut modules = bot.modules().lock().await;

        modules.load("alpha").await.unwrap();
        assert!(modules.is_active("alpha"));
        assert!(bot.router().read().get("a").is_some());
        assert_eq!(modules.status_label("alpha"), "active :white_check_mark:");
        assert_eq!(
            modules.load("alpha").await,
            Err(ModuleError::AlreadyLoaded("alpha".into()))
        );

        modules.unload("alpha").await.unwrap();
        assert!(!modules.is_active("alpha"));
        assert!(bot.router().read().get("a").is_none());
        assert_eq!(modules.status_label("alpha"), "inactive :x:");
        assert_eq!(
            modules.unload("alpha").await,
            Err(ModuleError::NotLoaded("alpha".into()))
        );
        assert_eq!(
            modules.unload("ghost").await,
            Err(ModuleError::NotFound("ghost".into()))
        );

        assert_eq!(*log.lock(), vec!["setup alpha", "teardown alpha"]);
    }

    #[tokio::test]
    async fn test_active_list_is_persisted() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (bot, _platform, _dir) = test_bot_with(catalog(&log));
        let store = bot.handle().store().clone();
        let mut modules = bot.modules().lock().await;

        modules.load("alpha").await.unwrap();
        modules.load("beta").await.unwrap();
        assert_eq!(store.open(None)["modules"], json!(["alpha", "beta"]));

        modules.reload("alpha").await.unwrap();
        assert_eq!(store.open(None)["modules"], json!(["alpha", "beta"]));

        modules.unload("alpha").await.unwrap();
        assert_eq!(store.open(None)["modules"], json!(["beta"]));
    }

    #[tokio::test]
    async fn test_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (bot, _platform, _dir) = test_bot_with(catalog(&log));
        let mut modules = bot.modules().lock().await;

        assert_eq!(
            modules.load("ghost").await,
            Err(ModuleError::NotFound("ghost".into()))
        );
        assert!(matches!(
            modules.load("broken").await,
            Err(ModuleError::Failed { .. })
        ));
        assert!(!modules.is_active("broken"));

        modules.load("alpha").await.unwrap();
        assert!(matches!(
            modules.load("clash").await,
            Err(ModuleError::Failed { .. })
        ));
        assert!(!modules.is_active("clash"));
        assert_eq!(modules.configured(), ["alpha".to_string()]);
        // The rejected module was torn down again
        assert!(log.lock().contains(&"teardown clash".to_string()));
        assert_eq!(
            modules.reload("beta").await,
            Err(ModuleError::NotLoaded("beta".into()))
        );
    }

    #[tokio::test]
    async fn test_load_configured_by_priority() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (bot, _platform, _dir) = test_bot_with(catalog(&log));
        let mut config = serde_json::Map::new();
        config.insert(
            "modules".into(),
            json!(["alpha", "ghost", "broken", "beta"]),
        );
        bot.handle().store().save(None, &config).unwrap();

        let mut modules = ModuleManager::new(
            catalog(&log),
            bot.router().clone(),
            bot.handle().clone(),
        );
        let loaded = modules.load_configured().await;

        assert_eq!(loaded, vec!["beta", "alpha"]);
        assert_eq!(*log.lock(), vec!["setup beta", "setup alpha"]);
        // Unknown or failing modules stay configured
        assert_eq!(modules.configured().len(), 4);
    }

    #[tokio::test]
    async fn test_module_events() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (bot, _platform, _dir) = test_bot_with(catalog(&log));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let loaded = seen.clone();
        bot.handle()
            .events()
            .on_module_loaded
            .register(Arc::new(move |name: &String| loaded.lock().push(format!("+{name}"))));
        let unloaded = seen.clone();
        bot.handle()
            .events()
            .on_module_unloaded
            .register(Arc::new(move |name: &String| unloaded.lock().push(format!("-{name}"))));

        let mut modules = bot.modules().lock().await;
        modules.load("alpha").await.unwrap();
        modules.unload("alpha").await.unwrap();
        assert_eq!(*seen.lock(), vec!["+alpha", "-alpha"]);
    }

    #[test]
    fn test_reports() {
        assert_eq!(
            ModuleOp::Load.report("ping", &Ok(())),
            ":white_check_mark: Module `ping` successfully loaded."
        );
        assert_eq!(
            ModuleOp::Load.report("ping", &Err(ModuleError::AlreadyLoaded("ping".into()))),
            ":white_check_mark: Module `ping` is already loaded"
        );
        assert_eq!(
            ModuleOp::Unload.report("ping", &Err(ModuleError::NotLoaded("ping".into()))),
            ":white_check_mark: Module `ping` is already unloaded"
        );
        assert_eq!(
            ModuleOp::Reload.report("ping", &Err(ModuleError::NotLoaded("ping".into()))),
            ":x: Module `ping` is not loaded"
        );
        assert_eq!(
            ModuleOp::Unload.report("nope", &Err(ModuleError::NotFound("nope".into()))),
            ":x: Module `nope` does not exists"
        );
        assert_eq!(
            ModuleOp::Reload.report(
                "ping",
                &Err(ModuleError::Failed {
                    name: "ping".into(),
                    reason: "boom".into()
                })
            ),
            ":x: Failed to reload module `ping`: `boom`"
        );
    }
}
