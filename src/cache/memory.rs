use super::{CacheKey, CacheStore, CacheValue};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: CacheValue,
    expires_at: Instant,
}

/// 进程内 TTL 缓存
///
/// 读取不加锁 (DashMap 分片), 过期条目在读取时惰性清除。
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<CacheKey, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let now = Instant::now();
        let hit = self.entries.get(key).map(|e| (e.expires_at > now, e.value.clone()))?;
        match hit {
            (true, value) => Some(value),
            (false, _) => {
                self.entries.remove_if(key, |_, e| e.expires_at <= now);
                None
            }
        }
    }

    fn set(&self, key: CacheKey, value: CacheValue, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}
