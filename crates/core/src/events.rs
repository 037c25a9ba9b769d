//! Typed event broadcast
//!
//! An [`Event`] is an ordered list of handlers sharing one argument type.
//! Handlers are compared by pointer, so keep the `Arc` around to unregister
//! it later.
//!
//! ```rust
//! use std::sync::Arc;
//! use dismob_core::events::{Event, Handler};
//!
//! let event: Event<String> = Event::new();
//! let handler: Handler<String> = Arc::new(|name: &String| println!("loaded {name}"));
//! assert!(event.register(handler.clone()));
//! event.dispatch(&"ping".to_string());
//! assert!(event.unregister(&handler));
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::bot::BotHandle;

/// Event handler
pub type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// A list of handlers called in registration order
pub struct Event<A> {
    name: &'static str,
    handlers: RwLock<Vec<Handler<A>>>,
}

fn same_handler<A>(a: &Handler<A>, b: &Handler<A>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

impl<A> Event<A> {
    /// Create an unnamed event
    #[must_use]
    pub fn new() -> Self {
        Self::named("event")
    }

    /// Create an event whose name shows up in logs
    #[must_use]
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Event name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Add a handler; returns `false` if it is already registered
    pub fn register(&self, handler: Handler<A>) -> bool {
        let mut handlers = self.handlers.write();
        if handlers.iter().any(|h| same_handler(h, &handler)) {
            warn!(event = self.name, "Handler is already registered");
            return false;
        }
        handlers.push(handler);
        debug!(event = self.name, count = handlers.len(), "Handler registered");
        true
    }

    /// Remove a handler; returns `false` if it was not registered
    pub fn unregister(&self, handler: &Handler<A>) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| !same_handler(h, handler));
        let removed = handlers.len() != before;
        if removed {
            debug!(event = self.name, count = handlers.len(), "Handler unregistered");
        }
        removed
    }

    /// Call every handler with `args`
    ///
    /// Handlers run on a snapshot of the list taken before the first call,
    /// so they may register or unregister handlers of this event.
    pub fn dispatch(&self, args: &A) {
        let snapshot: Vec<Handler<A>> = self.handlers.read().clone();
        debug!(event = self.name, count = snapshot.len(), "Dispatching event");
        for handler in snapshot {
            handler(args);
        }
    }

    /// Remove every handler
    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Number of handlers
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl<A> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("handlers", &self.len())
            .finish()
    }
}

/// Events raised by the bot
#[derive(Debug)]
pub struct BotEvents {
    /// The platform connection is ready and configured modules are loaded
    pub on_ready: Event<BotHandle>,
    /// A module was loaded; carries its name
    pub on_module_loaded: Event<String>,
    /// A module was unloaded; carries its name
    pub on_module_unloaded: Event<String>,
}

impl BotEvents {
    /// Create the event set with no handlers
    #[must_use]
    pub fn new() -> Self {
        Self {
            on_ready: Event::named("on_ready"),
            on_module_loaded: Event::named("on_module_loaded"),
            on_module_unloaded: Event::named("on_module_unloaded"),
        }
    }

    /// Remove every handler of every event
    pub fn clear(&self) {
        self.on_ready.clear();
        self.on_module_loaded.clear();
        self.on_module_unloaded.clear();
    }
}

impl Default for BotEvents {
    fn default() -> Self {
        Self::new()
    }
}
