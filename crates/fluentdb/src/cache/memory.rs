use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{Cache, CacheError};
use crate::config::MemoryCacheConfig;
use crate::connection::Row;

/// In-process cache with per-entry TTL and LRU eviction.
#[derive(Debug)]
pub struct MemoryCache {
    inner: Mutex<MemoryCacheInner>,
}

#[derive(Debug)]
struct MemoryCacheInner {
    capacity: usize,
    map: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    rows: Vec<Row>,
    written_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl_hint: Option<Duration>) -> bool {
        let age = now.saturating_duration_since(self.written_at);
        let limit = match ttl_hint {
            Some(hint) => hint.min(self.ttl),
            None => self.ttl,
        };
        age < limit
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(MemoryCacheConfig::default())
    }
}

impl MemoryCache {
    pub fn new(config: MemoryCacheConfig) -> Self {
        Self {
            inner: Mutex::new(MemoryCacheInner {
                capacity: config.capacity,
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Number of stored entries, expired ones included until they are next looked up.
    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock()
            .map(|inner| inner.map.contains_key(key))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.map.clear();
            inner.order.clear();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryCacheInner>, CacheError> {
        self.inner
            .lock()
            .map_err(|_| CacheError::Backend("memory cache lock poisoned".to_string()))
    }

    #[cfg(test)]
    fn backdate(&self, key: &str, by: Duration) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.map.get_mut(key) {
            entry.written_at = entry.written_at.checked_sub(by).unwrap();
        }
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str, ttl_hint: Option<Duration>) -> Result<Option<Vec<Row>>, CacheError> {
        let mut inner = self.lock()?;
        let fresh = match inner.map.get(key) {
            Some(entry) => entry.is_fresh(Instant::now(), ttl_hint),
            None => return Ok(None),
        };
        if !fresh {
            inner.remove(key);
            return Ok(None);
        }
        let rows = inner.map.get(key).map(|entry| entry.rows.clone());
        inner.touch(key);
        Ok(rows)
    }

    fn set(&self, key: &str, rows: &[Row], ttl: Duration) -> Result<(), CacheError> {
        let mut inner = self.lock()?;
        let entry = CacheEntry {
            rows: rows.to_vec(),
            written_at: Instant::now(),
            ttl,
        };
        if inner.map.insert(key.to_string(), entry).is_some() {
            inner.touch(key);
        } else {
            inner.order.push_back(key.to_string());
        }
        inner.evict_if_needed();
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

impl MemoryCacheInner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k.as_str() == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if self.map.remove(key).is_some() {
            if let Some(pos) = self.order.iter().position(|k| k.as_str() == key) {
                let _ = self.order.remove(pos);
            }
        }
    }

    fn evict_if_needed(&mut self) {
        if self.capacity == 0 {
            self.map.clear();
            self.order.clear();
            return;
        }

        while self.map.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            let _ = self.map.remove(&oldest);
        }
    }
}
