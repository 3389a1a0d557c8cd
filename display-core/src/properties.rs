//! Plugin panel properties and status reporting
//!
//! The host UI writes property values; displays observe changes on their
//! update tick via `take_changed`. Status lines are keyed strings the panel
//! renders next to the display name.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};

/// A typed property widget
pub struct Property<T> {
    name: &'static str,
    description: &'static str,
    value: RwLock<T>,
    changed: AtomicBool,
}

impl<T: Clone> Property<T> {
    /// Create a property with an initial value
    pub fn new(name: &'static str, description: &'static str, initial: T) -> Self {
        Self {
            name,
            description,
            value: RwLock::new(initial),
            changed: AtomicBool::new(false),
        }
    }

    /// Property name shown in the panel
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Tooltip text
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Current value
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Set the value and mark the property changed
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.changed.store(true, Ordering::Release);
    }

    /// Consume the change flag
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }
}

/// Severity of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatusLevel {
    /// Everything fine
    Ok,
    /// Degraded but operating
    Warn,
    /// Not operating
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLevel::Ok => f.write_str("Ok"),
            StatusLevel::Warn => f.write_str("Warn"),
            StatusLevel::Error => f.write_str("Error"),
        }
    }
}

/// Keyed status lines for a display
#[derive(Default)]
pub struct StatusBoard {
    entries: RwLock<BTreeMap<String, (StatusLevel, String)>>,
}

impl StatusBoard {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a status line
    pub fn set(&self, level: StatusLevel, key: &str, text: impl Into<String>) {
        let text = text.into();
        match level {
            StatusLevel::Ok => {}
            StatusLevel::Warn => warn!(status = key, "{}", text),
            StatusLevel::Error => error!(status = key, "{}", text),
        }
        self.entries
            .write()
            .insert(key.to_string(), (level, text));
    }

    /// Remove a status line
    pub fn clear(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Remove all status lines
    pub fn clear_all(&self) {
        self.entries.write().clear();
    }

    /// Level of a status line, if present
    pub fn level(&self, key: &str) -> Option<StatusLevel> {
        self.entries.read().get(key).map(|(level, _)| *level)
    }

    /// Text of a status line, if present
    pub fn text(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).map(|(_, text)| text.clone())
    }

    /// Worst level across all lines; `Ok` when the board is empty
    pub fn overall(&self) -> StatusLevel {
        self.entries
            .read()
            .values()
            .map(|(level, _)| *level)
            .max()
            .unwrap_or(StatusLevel::Ok)
    }
}
