//! In-memory store client.
//!
//! A tree of JSON values behind the [`StoreClient`] contract. This is the
//! substitute backend every test runs against, and it mirrors the remote
//! store's observable semantics:
//!
//! - slash-separated paths address nested objects
//! - writing `null` (or `None` in an atomic update) deletes the path
//! - empty parent objects are pruned, so "exists" means "holds data"
//! - atomic updates apply every path or none
//! - subscriptions fire on any write affecting the path or its subtree
//!
//! Fault injection: [`MemoryStore::fail_matching`] makes operations on
//! matching paths fail with an unavailable error, which is how tests
//! exercise per-record failure isolation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

use super::{ChangeCallback, Snapshot, StoreClient, Subscription, UpdateMap};

struct Sub {
    path: String,
    callback: ChangeCallback,
}

type SubMap = Arc<Mutex<HashMap<u64, Arc<Sub>>>>;

/// In-memory [`StoreClient`] implementation.
pub struct MemoryStore {
    root: RwLock<Value>,
    subs: SubMap,
    next_sub: AtomicU64,
    fail_fragments: RwLock<Vec<String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            subs: Arc::new(Mutex::new(HashMap::new())),
            next_sub: AtomicU64::new(1),
            fail_fragments: RwLock::new(Vec::new()),
        }
    }

    /// Makes every operation touching a path that contains `fragment`
    /// fail with [`StoreError::Unavailable`]. For an atomic update, one
    /// matching path fails the whole call.
    pub fn fail_matching(&self, fragment: impl Into<String>) {
        self.fail_fragments
            .write()
            .expect("fail list lock poisoned")
            .push(fragment.into());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.fail_fragments
            .write()
            .expect("fail list lock poisoned")
            .clear();
    }

    /// Dumps the whole tree. Test helper.
    pub fn dump(&self) -> Value {
        self.root.read().expect("store lock poisoned").clone()
    }

    fn check_poisoned(&self, path: &str) -> Result<()> {
        let fragments = self
            .fail_fragments
            .read()
            .expect("fail list lock poisoned");
        if let Some(fragment) = fragments.iter().find(|f| path.contains(f.as_str())) {
            return Err(StoreError::unavailable(format!(
                "injected failure on '{}' (path {})",
                fragment, path
            ))
            .into());
        }
        Ok(())
    }

    fn segments(path: &str) -> Vec<&str> {
        path.split('/').filter(|s| !s.is_empty()).collect()
    }

    fn get_at(root: &Value, path: &str) -> Option<Value> {
        let mut node = root;
        for seg in Self::segments(path) {
            node = node.as_object()?.get(seg)?;
        }
        Some(node.clone())
    }

    fn set_at(root: &mut Value, path: &str, value: Value) {
        let segs = Self::segments(path);
        if segs.is_empty() {
            *root = value;
            return;
        }
        let mut node = root;
        for seg in &segs[..segs.len() - 1] {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = node
                .as_object_mut()
                .expect("just coerced to object")
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node.as_object_mut()
            .expect("just coerced to object")
            .insert(segs[segs.len() - 1].to_string(), value);
    }

    /// Removes the path; empty parents are pruned so absence reads as
    /// "exists() == false" all the way up.
    fn remove_at(root: &mut Value, path: &str) {
        fn walk(node: &mut Value, segs: &[&str]) -> bool {
            let Some(map) = node.as_object_mut() else {
                return false;
            };
            if segs.len() == 1 {
                map.remove(segs[0]);
            } else if let Some(child) = map.get_mut(segs[0]) {
                if walk(child, &segs[1..]) {
                    map.remove(segs[0]);
                }
            }
            map.is_empty()
        }
        let segs = Self::segments(path);
        if segs.is_empty() {
            *root = Value::Object(Map::new());
            return;
        }
        walk(root, &segs);
    }

    /// True when a write at `mutated` is visible from a subscription at
    /// `watched`: equal paths, or either is an ancestor of the other.
    fn affects(mutated: &str, watched: &str) -> bool {
        mutated == watched
            || mutated.starts_with(&format!("{}/", watched))
            || watched.starts_with(&format!("{}/", mutated))
    }

    fn notify(&self, mutated_paths: &[String]) {
        // Snapshot the subscriber list and current values first, then fire
        // outside both locks so callbacks may re-enter the store.
        let pending: Vec<(Arc<Sub>, Option<Value>)> = {
            let subs = self.subs.lock().expect("subs lock poisoned");
            let root = self.root.read().expect("store lock poisoned");
            subs.values()
                .filter(|sub| {
                    mutated_paths
                        .iter()
                        .any(|p| Self::affects(p, &sub.path))
                })
                .map(|sub| (Arc::clone(sub), Self::get_at(&root, &sub.path)))
                .collect()
        };
        for (sub, value) in pending {
            (sub.callback)(value.as_ref());
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn read(&self, path: &str) -> Result<Snapshot> {
        self.check_poisoned(path)?;
        let root = self.root.read().expect("store lock poisoned");
        Ok(Snapshot::new(path, Self::get_at(&root, path)))
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.check_poisoned(path)?;
        {
            let mut root = self.root.write().expect("store lock poisoned");
            if value.is_null() {
                Self::remove_at(&mut root, path);
            } else {
                Self::set_at(&mut root, path, value);
            }
        }
        self.notify(&[path.to_string()]);
        Ok(())
    }

    async fn atomic_update(&self, updates: UpdateMap) -> Result<()> {
        for path in updates.keys() {
            self.check_poisoned(path)?;
        }
        let paths: Vec<String> = updates.keys().cloned().collect();
        {
            let mut root = self.root.write().expect("store lock poisoned");
            for (path, value) in updates {
                match value {
                    Some(v) if !v.is_null() => Self::set_at(&mut root, &path, v),
                    _ => Self::remove_at(&mut root, &path),
                }
            }
        }
        self.notify(&paths);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.check_poisoned(path)?;
        {
            let mut root = self.root.write().expect("store lock poisoned");
            Self::remove_at(&mut root, path);
        }
        self.notify(&[path.to_string()]);
        Ok(())
    }

    async fn write_if_absent(&self, path: &str, value: Value) -> Result<bool> {
        self.check_poisoned(path)?;
        let created = {
            let mut root = self.root.write().expect("store lock poisoned");
            if Self::get_at(&root, path).is_some() {
                false
            } else {
                Self::set_at(&mut root, path, value);
                true
            }
        };
        if created {
            self.notify(&[path.to_string()]);
        }
        Ok(created)
    }

    fn subscribe(&self, path: &str, on_change: ChangeCallback) -> Subscription {
        let id = self.next_sub.fetch_add(1, Ordering::Relaxed);
        self.subs.lock().expect("subs lock poisoned").insert(
            id,
            Arc::new(Sub {
                path: path.to_string(),
                callback: on_change,
            }),
        );
        let subs = Arc::clone(&self.subs);
        Subscription::new(move || {
            subs.lock().expect("subs lock poisoned").remove(&id);
        })
    }
}
