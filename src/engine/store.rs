use anyhow::Result;
use std::collections::BTreeMap;

/// Flat key/value storage for stack metadata.
///
/// Keys use git-config syntax (`section.subsection.name`). Every `set` and
/// `unset` must be durable when it returns: a crash between two writes may
/// leave the second one missing, never a half-written value.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn unset(&mut self, key: &str) -> Result<()>;

    /// All entries whose key starts with `prefix`.
    fn entries(&self, prefix: &str) -> Result<Vec<(String, String)>>;
}

/// In-memory store used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn unset(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn entries(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .values
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
