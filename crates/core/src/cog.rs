//! Feature modules
//!
//! A cog bundles commands and event handlers that can be loaded and unloaded
//! while the bot runs. The [`CogCatalog`] lists the cogs the bot knows how to
//! build; the [`ModuleManager`](crate::modules::ModuleManager) decides which
//! ones are live.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bot::BotHandle;
use crate::commands::Command;
use crate::error::Result;

/// A loadable feature module
#[async_trait]
pub trait Cog: Send + Sync {
    /// Module name, as used by the `modules` commands and in `config.json`
    fn name(&self) -> &str;

    /// One-line description
    fn description(&self) -> &str {
        "No description provided"
    }

    /// Load order at startup; higher loads first
    fn priority(&self) -> i32 {
        0
    }

    /// Commands added to the router while the module is loaded
    fn commands(&self) -> Vec<Command>;

    /// Called when the module is loaded
    async fn setup(&mut self, _bot: &BotHandle) -> Result<()> {
        Ok(())
    }

    /// Called when the module is unloaded or the bot stops
    async fn teardown(&mut self, _bot: &BotHandle) -> Result<()> {
        Ok(())
    }

    /// Module metadata
    fn metadata(&self) -> CogMetadata {
        CogMetadata {
            name: self.name().to_string(),
            description: self.description().to_string(),
            priority: self.priority(),
            commands: self.commands().iter().map(|c| c.name().to_string()).collect(),
        }
    }
}

/// Cog metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CogMetadata {
    /// Module name
    pub name: String,
    /// Module description
    pub description: String,
    /// Load priority
    pub priority: i32,
    /// Top-level command names
    pub commands: Vec<String>,
}

/// Builds a fresh cog instance
pub type CogFactory = Arc<dyn Fn() -> Box<dyn Cog> + Send + Sync>;

/// Modules available to the bot, by name
#[derive(Clone, Default)]
pub struct CogCatalog {
    factories: BTreeMap<String, CogFactory>,
}

impl CogCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module; a module with the same name is replaced
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Cog> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registering module `{}` in catalog", name);
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            warn!("Module `{}` was already in the catalog and has been replaced", name);
        }
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Cog> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Sorted module names
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Whether a module exists
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a fresh instance of a module
    pub fn create(&self, name: &str) -> Option<Box<dyn Cog>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for CogCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CogCatalog")
            .field("modules", &self.names())
            .finish()
    }
}
