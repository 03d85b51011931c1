use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Shared context for passing data between workflow stages.
///
/// Keys are stage output keys; values are JSON for maximum flexibility.
/// Keys are write-once within a run: each stage produces exactly one key
/// and no later stage may overwrite it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedContext {
    data: HashMap<String, serde_json::Value>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from seed data.
    pub fn from_map(data: HashMap<String, serde_json::Value>) -> Self {
        Self { data }
    }

    /// Create a context seeded with a single key.
    pub fn seeded(key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut data = HashMap::new();
        data.insert(key.into(), value);
        Self { data }
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Get a value as a string, if it's a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Insert a value, enforcing the write-once invariant.
    ///
    /// Returns `false` and leaves the existing value untouched if the key
    /// was already written.
    #[must_use]
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) -> bool {
        match self.data.entry(key.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(value);
                true
            }
        }
    }

    /// Get the underlying data map.
    pub fn data(&self) -> &HashMap<String, serde_json::Value> {
        &self.data
    }

    pub fn into_data(self) -> HashMap<String, serde_json::Value> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_operations() {
        let mut ctx = SharedContext::new();
        assert!(ctx.insert("name", json!("Alice")));
        assert!(ctx.insert("count", json!(42)));

        assert_eq!(ctx.get_str("name"), Some("Alice"));
        assert_eq!(ctx.get("count"), Some(&json!(42)));
        assert_eq!(ctx.get("missing"), None);
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_write_once() {
        let mut ctx = SharedContext::seeded("idea", json!("AI tutor"));
        assert!(!ctx.insert("idea", json!("overwritten")));
        assert_eq!(ctx.get_str("idea"), Some("AI tutor"));
    }

    #[test]
    fn test_from_map() {
        let mut map = HashMap::new();
        map.insert("topic".into(), json!("AI"));
        let ctx = SharedContext::from_map(map);
        assert_eq!(ctx.get_str("topic"), Some("AI"));
    }
}
