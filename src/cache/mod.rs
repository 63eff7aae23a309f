//! 联系人目录与地址的共享缓存
//!
//! 缓存由宿主程序创建并注入到每个导入器中, 所有导入器共享同一实例。
//! 同一个 key 的并发未命中会合并为一次上游请求 (single-flight)。
//! 加载在独立任务中运行到结束, 不受等待方取消的影响。

pub mod memory;

pub use memory::MemoryCache;

use crate::error::{ImportError, UpstreamFailure};
use crate::models::{Address, ContactRecord};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// 默认缓存有效期: 15 分钟
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Contacts { client_id: String },
    Address { client_id: String, contact_id: String },
}

impl CacheKey {
    pub fn contacts(client_id: impl Into<String>) -> Self {
        CacheKey::Contacts {
            client_id: client_id.into(),
        }
    }

    pub fn address(client_id: impl Into<String>, contact_id: impl Into<String>) -> Self {
        CacheKey::Address {
            client_id: client_id.into(),
            contact_id: contact_id.into(),
        }
    }

    /// 加载任务异常终止时报告的失败类型
    fn failure_kind(&self) -> UpstreamFailure {
        match self {
            CacheKey::Contacts { .. } => UpstreamFailure::ContactLoadFailed,
            CacheKey::Address { .. } => UpstreamFailure::AddressLoadFailed,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Contacts { client_id } => write!(f, "{}/contacts", client_id),
            CacheKey::Address {
                client_id,
                contact_id,
            } => write!(f, "{}/address/{}", client_id, contact_id),
        }
    }
}

/// 缓存值均为不可变快照
#[derive(Debug, Clone)]
pub enum CacheValue {
    Contacts(Arc<Vec<ContactRecord>>),
    Address(Arc<Address>),
}

/// 结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheSource {
    /// 本次请求从上游加载
    Upstream,
    /// 等待了另一个并发请求的上游加载
    Joined,
    /// 命中缓存
    Cache,
}

impl CacheSource {
    pub fn is_cached(self) -> bool {
        self != CacheSource::Upstream
    }
}

/// 缓存存储抽象
pub trait CacheStore: fmt::Debug + Send + Sync {
    /// 过期条目视为不存在
    fn get(&self, key: &CacheKey) -> Option<CacheValue>;
    fn set(&self, key: CacheKey, value: CacheValue, ttl: Duration);
}

type InFlight = Shared<BoxFuture<'static, Result<CacheValue, ImportError>>>;

/// 带 single-flight 的共享缓存
pub struct SharedCache {
    store: Arc<dyn CacheStore>,
    in_flight: Arc<DashMap<CacheKey, InFlight>>,
}

impl SharedCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.store.get(key)
    }

    pub fn set(&self, key: CacheKey, value: CacheValue, ttl: Duration) {
        self.store.set(key, value, ttl)
    }

    /// 命中则直接返回; 未命中时执行 `load`, 成功结果写入缓存后返回。
    ///
    /// 同一 key 已有加载在进行时, 等待该加载而不是重复请求上游。
    /// 失败结果不写入缓存。
    pub async fn get_or_load<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        load: F,
    ) -> Result<(CacheValue, CacheSource), ImportError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<CacheValue, ImportError>> + Send + 'static,
    {
        if let Some(value) = self.store.get(&key) {
            tracing::debug!("cache hit: {}", key);
            return Ok((value, CacheSource::Cache));
        }

        let (flight, source) = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(e) => (e.get().clone(), CacheSource::Joined),
            Entry::Vacant(e) => {
                let store = Arc::clone(&self.store);
                let in_flight = Arc::clone(&self.in_flight);
                let cache_key = key.clone();
                let fut = load();
                // 先写缓存再移除 in-flight 记录, 两者之间没有空档
                let task = tokio::spawn(async move {
                    let result = fut.await;
                    if let Ok(value) = &result {
                        store.set(cache_key.clone(), value.clone(), ttl);
                    }
                    in_flight.remove(&cache_key);
                    result
                });
                let failure = key.failure_kind();
                let flight = async move {
                    task.await.unwrap_or_else(|e| {
                        Err(ImportError::upstream(failure, format!("cache load aborted: {}", e)))
                    })
                }
                .boxed()
                .shared();
                e.insert(flight.clone());
                (flight, CacheSource::Upstream)
            }
        };

        if source == CacheSource::Joined {
            tracing::debug!("joining in-flight load: {}", key);
        }

        flight.await.map(|value| (value, source))
    }
}

impl fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCache")
            .field("store", &self.store)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl Default for SharedCache {
    fn default() -> Self {
        Self::in_memory()
    }
}
