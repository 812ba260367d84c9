//! Name normalisation and alias lookup.
//!
//! Matching is exact after normalisation (trim, lowercase). There is no
//! fuzzy matching: a name either resolves or it does not.

use std::collections::HashMap;

pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Maps every accepted name (canonical id or alias) to its canonical id.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    names: HashMap<String, String>,
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` as resolving to `canonical`. On collision, returns the
    /// canonical id the name already resolves to and leaves the table unchanged.
    pub fn insert(&mut self, name: &str, canonical: &str) -> Result<(), String> {
        let key = normalize(name);
        if let Some(existing) = self.names.get(&key) {
            return Err(existing.clone());
        }
        self.names.insert(key, canonical.to_string());
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.names.get(&normalize(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
