//! Compilation-scoped registry of mixin definitions

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::parser::ast::NodeList;

/// Errors that can occur during mixin registration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MixinError {
    /// Same name declared twice in one compilation
    #[error("'mixin' tag with name '{name}' appears more than once")]
    Duplicate { name: String },
}

/// Mixin bodies available to `mix` tags later in the same compilation
///
/// A name is *declared* when its `mixin` tag is reached and *defined* once its
/// body has been compiled, so a mixin cannot be invoked from inside its own
/// body.
#[derive(Debug, Default)]
pub struct MixinTable {
    declared: HashSet<String>,
    mixins: HashMap<String, Arc<NodeList>>,
}

impl MixinTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a name before its body is parsed
    pub fn declare(&mut self, name: &str) -> Result<(), MixinError> {
        if !self.declared.insert(name.to_string()) {
            return Err(MixinError::Duplicate {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Store the compiled body of a mixin
    ///
    /// Callers declare `name` first; [`declare`](Self::declare) is where
    /// duplicates are rejected.
    pub fn define(&mut self, name: &str, nodelist: Arc<NodeList>) {
        self.declared.insert(name.to_string());
        self.mixins.insert(name.to_string(), nodelist);
    }

    /// Get a defined mixin body by name
    pub fn get(&self, name: &str) -> Option<&Arc<NodeList>> {
        self.mixins.get(name)
    }

    /// Check if a mixin is defined
    pub fn contains(&self, name: &str) -> bool {
        self.mixins.contains_key(name)
    }

    /// Get all defined mixin names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mixins.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.mixins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mixins.is_empty()
    }
}
