use super::{IdentityError, IdentityStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

/// Identity store kept in memory, for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.lock().insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_or_create(
        &self,
        key: &str,
        _comment: Option<&str>,
    ) -> Result<String, IdentityError> {
        let mut entries = self.entries.lock();
        let value = entries
            .entry(key.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string());
        Ok(value.clone())
    }
}
