// Store Port
// Abstraction over the shared key-value store. Each operation is atomic on
// its own; no cross-key transactions are assumed anywhere above this trait.

use crate::error::Result;
use async_trait::async_trait;

/// Shared key-value store offering set, ordered-list, and hash primitives.
///
/// All values are strings; JSON encoding happens above this port. Lists are
/// FIFO through `list_push_back` / `list_pop_front`.
///
/// Implementations:
/// - `RedisStore` (infra-redis crate): production adapter
/// - [`memory::MemoryStore`]: tests and local development
#[async_trait]
pub trait Store: Send + Sync {
    /// Add a member to a set. No-op if already present.
    async fn set_add(&self, key: &str, member: &str) -> Result<()>;

    /// All members of a set. Empty when the key is absent. No ordering.
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// Push a value onto the tail of a list, creating it if absent.
    async fn list_push_back(&self, key: &str, value: &str) -> Result<()>;

    /// Pop the head of a list. `None` when the list is empty or absent.
    async fn list_pop_front(&self, key: &str) -> Result<Option<String>>;

    /// Every element of a list, head to tail.
    async fn list_all(&self, key: &str) -> Result<Vec<String>>;

    /// Set a hash field, creating the hash if absent.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Read a hash field. `None` when the hash or field is absent.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Every field/value pair of a hash. Empty when the key is absent.
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>>;

    /// Delete a single hash field. No-op when absent.
    async fn hash_delete(&self, key: &str, field: &str) -> Result<()>;

    /// Delete a key of any kind. No-op when absent.
    async fn delete(&self, key: &str) -> Result<()>;
}

// ============================================================================
// In-memory implementation for tests and local development
// ============================================================================

pub mod memory {
    use super::*;
    use crate::error::AppError;
    use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
    use std::sync::Mutex;

    enum Entry {
        Set(BTreeSet<String>),
        List(VecDeque<String>),
        Hash(BTreeMap<String, String>),
    }

    impl Entry {
        fn kind(&self) -> &'static str {
            match self {
                Entry::Set(_) => "set",
                Entry::List(_) => "list",
                Entry::Hash(_) => "hash",
            }
        }
    }

    /// Mutex-guarded in-memory [`Store`].
    ///
    /// Mirrors the store semantics the broker relies on: single-operation
    /// atomicity and a kind error when a key is touched as the wrong
    /// collection type.
    #[derive(Default)]
    pub struct MemoryStore {
        entries: Mutex<HashMap<String, Entry>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    fn wrong_kind(key: &str, found: &Entry, wanted: &'static str) -> AppError {
        AppError::Store(format!(
            "key {} holds a {} value, expected {}",
            key,
            found.kind(),
            wanted
        ))
    }

    #[async_trait]
    impl Store for MemoryStore {
        async fn set_add(&self, key: &str, member: &str) -> Result<()> {
            let mut entries = self.entries.lock().unwrap();
            match entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::Set(BTreeSet::new()))
            {
                Entry::Set(set) => {
                    set.insert(member.to_string());
                    Ok(())
                }
                other => Err(wrong_kind(key, other, "set")),
            }
        }

        async fn set_members(&self, key: &str) -> Result<Vec<String>> {
            let entries = self.entries.lock().unwrap();
            match entries.get(key) {
                None => Ok(Vec::new()),
                Some(Entry::Set(set)) => Ok(set.iter().cloned().collect()),
                Some(other) => Err(wrong_kind(key, other, "set")),
            }
        }

        async fn list_push_back(&self, key: &str, value: &str) -> Result<()> {
            let mut entries = self.entries.lock().unwrap();
            match entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::List(VecDeque::new()))
            {
                Entry::List(list) => {
                    list.push_back(value.to_string());
                    Ok(())
                }
                other => Err(wrong_kind(key, other, "list")),
            }
        }

        async fn list_pop_front(&self, key: &str) -> Result<Option<String>> {
            let mut entries = self.entries.lock().unwrap();
            let popped = match entries.get_mut(key) {
                None => return Ok(None),
                Some(Entry::List(list)) => list.pop_front(),
                Some(other) => return Err(wrong_kind(key, other, "list")),
            };
            // An emptied list key disappears, matching Redis behavior.
            if matches!(entries.get(key), Some(Entry::List(list)) if list.is_empty()) {
                entries.remove(key);
            }
            Ok(popped)
        }

        async fn list_all(&self, key: &str) -> Result<Vec<String>> {
            let entries = self.entries.lock().unwrap();
            match entries.get(key) {
                None => Ok(Vec::new()),
                Some(Entry::List(list)) => Ok(list.iter().cloned().collect()),
                Some(other) => Err(wrong_kind(key, other, "list")),
            }
        }

        async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
            let mut entries = self.entries.lock().unwrap();
            match entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::Hash(BTreeMap::new()))
            {
                Entry::Hash(hash) => {
                    hash.insert(field.to_string(), value.to_string());
                    Ok(())
                }
                other => Err(wrong_kind(key, other, "hash")),
            }
        }

        async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
            let entries = self.entries.lock().unwrap();
            match entries.get(key) {
                None => Ok(None),
                Some(Entry::Hash(hash)) => Ok(hash.get(field).cloned()),
                Some(other) => Err(wrong_kind(key, other, "hash")),
            }
        }

        async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>> {
            let entries = self.entries.lock().unwrap();
            match entries.get(key) {
                None => Ok(Vec::new()),
                Some(Entry::Hash(hash)) => Ok(hash
                    .iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect()),
                Some(other) => Err(wrong_kind(key, other, "hash")),
            }
        }

        async fn hash_delete(&self, key: &str, field: &str) -> Result<()> {
            let mut entries = self.entries.lock().unwrap();
            let emptied = match entries.get_mut(key) {
                None => return Ok(()),
                Some(Entry::Hash(hash)) => {
                    hash.remove(field);
                    hash.is_empty()
                }
                Some(other) => return Err(wrong_kind(key, other, "hash")),
            };
            if emptied {
                entries.remove(key);
            }
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
