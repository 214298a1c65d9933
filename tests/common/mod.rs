//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use herald::{ChangeAware, NotifyPropertyChanged, PropertyChangedSource, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// An element that raises `Name` whenever it is renamed.
#[derive(Debug)]
pub struct Person {
    name: Mutex<String>,
    changes: PropertyChangedSource,
}

impl Person {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: Mutex::new(name.to_string()),
            changes: PropertyChangedSource::new(),
        })
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn rename(&self, name: &str) -> Result<()> {
        *self.name.lock() = name.to_string();
        self.changes.raise("Name")
    }

    /// Number of collections (or anything else) listening to this person.
    pub fn listeners(&self) -> usize {
        self.changes.handler_count()
    }
}

impl ChangeAware for Person {
    fn property_notifier(&self) -> Option<&dyn NotifyPropertyChanged> {
        Some(&self.changes)
    }
}
