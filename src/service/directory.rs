use super::ImportSettings;
use crate::cache::{CacheKey, CacheSource, CacheValue, SharedCache};
use crate::error::{ImportError, UpstreamFailure};
use crate::models::{wire, ContactRecord};
use crate::upstream::{with_timeout, ContactService};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// 联系人目录快照
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    pub contacts: Arc<Vec<ContactRecord>>,
    pub source: CacheSource,
}

/// 某个账套的全部联系人
///
/// 先查共享缓存, 未命中时按创建时间升序分页拉取全部联系人并写入缓存。
/// 同一实例内最多加载一次。
pub struct ContactDirectory {
    client_id: String,
    source: Arc<dyn ContactService>,
    cache: Arc<SharedCache>,
    settings: ImportSettings,
    loaded: OnceCell<Arc<Vec<ContactRecord>>>,
}

impl ContactDirectory {
    pub fn new(
        client_id: impl Into<String>,
        source: Arc<dyn ContactService>,
        cache: Arc<SharedCache>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            source,
            cache,
            settings,
            loaded: OnceCell::new(),
        }
    }

    pub async fn load_all(&self) -> Result<DirectorySnapshot, ImportError> {
        if let Some(contacts) = self.loaded.get() {
            return Ok(DirectorySnapshot {
                contacts: Arc::clone(contacts),
                source: CacheSource::Cache,
            });
        }

        let key = CacheKey::contacts(self.client_id.as_str());
        let source = Arc::clone(&self.source);
        let page_size = self.settings.page_size.max(1);
        let max_pages = self.settings.max_pages.max(1);
        let call_timeout = self.settings.call_timeout;

        let (value, origin) = self
            .cache
            .get_or_load(key, self.settings.cache_ttl, move || {
                fetch_all_pages(source, page_size, max_pages, call_timeout)
            })
            .await?;

        let CacheValue::Contacts(contacts) = value else {
            return Err(ImportError::upstream(
                UpstreamFailure::ContactLoadFailed,
                "cache entry is not a contact list",
            ));
        };

        tracing::info!(
            "Loaded {} contacts for client {} ({:?})",
            contacts.len(),
            self.client_id,
            origin
        );

        let _ = self.loaded.set(Arc::clone(&contacts));
        Ok(DirectorySnapshot {
            contacts,
            source: origin,
        })
    }
}

/// 分页直到某页不足一页 (整页倍数时会多请求一次空页), 最多 `max_pages` 页
async fn fetch_all_pages(
    source: Arc<dyn ContactService>,
    page_size: usize,
    max_pages: usize,
    call_timeout: Duration,
) -> Result<CacheValue, ImportError> {
    let mut contacts = Vec::new();
    let mut offset = 0;

    for _ in 0..max_pages {
        let response = with_timeout(
            "list contacts",
            call_timeout,
            source.list_contacts(offset, page_size),
        )
        .await?;
        let page = parse_page(&response)?;
        let fetched = page.len();
        tracing::debug!("contact page offset={} fetched={}", offset, fetched);

        contacts.extend(page);
        offset += fetched;
        if fetched < page_size {
            return Ok(CacheValue::Contacts(Arc::new(contacts)));
        }
    }

    tracing::error!("✗ contact listing still returns full pages after {} pages", max_pages);
    Err(ImportError::upstream(
        UpstreamFailure::ContactLoadFailed,
        format!("contact listing did not end within {} pages of {}", max_pages, page_size),
    ))
}

fn parse_page(response: &Value) -> Result<Vec<ContactRecord>, ImportError> {
    let objects = wire::objects(response)
        .filter(|o| o.is_array())
        .ok_or_else(|| ImportError::malformed(UpstreamFailure::ContactLoadFailed, "contact list", response))?;

    serde_json::from_value(objects.clone()).map_err(|e| {
        ImportError::upstream(
            UpstreamFailure::ContactLoadFailed,
            format!("invalid contact record: {}", e),
        )
    })
}
