use super::ImportSettings;
use crate::cache::{CacheKey, CacheValue, SharedCache};
use crate::error::{ImportError, UpstreamFailure};
use crate::models::{wire, Address};
use crate::upstream::{with_timeout, ContactService};
use serde_json::Value;
use std::sync::Arc;

/// 联系人主地址, 按 (账套, 联系人) 缓存
pub struct AddressCache {
    source: Arc<dyn ContactService>,
    cache: Arc<SharedCache>,
    settings: ImportSettings,
}

impl AddressCache {
    pub fn new(source: Arc<dyn ContactService>, cache: Arc<SharedCache>, settings: ImportSettings) -> Self {
        Self {
            source,
            cache,
            settings,
        }
    }

    pub async fn load_address(&self, client_id: &str, contact_id: &str) -> Result<Arc<Address>, ImportError> {
        let source = Arc::clone(&self.source);
        let owned_id = contact_id.to_string();
        let call_timeout = self.settings.call_timeout;

        let (value, origin) = self
            .cache
            .get_or_load(
                CacheKey::address(client_id, contact_id),
                self.settings.cache_ttl,
                move || async move {
                    let response =
                        with_timeout("load address", call_timeout, source.contact_address(&owned_id)).await?;
                    Ok(CacheValue::Address(Arc::new(parse_address(&response)?)))
                },
            )
            .await?;

        match value {
            CacheValue::Address(address) => {
                tracing::debug!("address of contact #{} ({:?})", contact_id, origin);
                Ok(address)
            }
            CacheValue::Contacts(_) => Err(ImportError::upstream(
                UpstreamFailure::AddressLoadFailed,
                "cache entry is not an address",
            )),
        }
    }
}

/// `objects` 可以是地址对象, 也可以是只含一个地址的数组
fn parse_address(response: &Value) -> Result<Address, ImportError> {
    let payload = match wire::objects(response) {
        Some(Value::Array(items)) => items.first(),
        Some(obj @ Value::Object(_)) => Some(obj),
        _ => None,
    }
    .ok_or_else(|| ImportError::malformed(UpstreamFailure::AddressLoadFailed, "address", response))?;

    serde_json::from_value(payload.clone()).map_err(|e| {
        ImportError::upstream(UpstreamFailure::AddressLoadFailed, format!("invalid address: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn address_payload_may_be_wrapped_in_a_list() {
        let address = parse_address(&json!({
            "objects": [{ "id": "9", "city": "Berlin", "country": { "id": "1", "objectName": "StaticCountry" } }]
        }))
        .unwrap();

        assert_eq!(address.city.as_deref(), Some("Berlin"));
        assert_eq!(address.country_id.as_deref(), Some("1"));
    }

    #[test]
    fn missing_payload_is_an_address_failure() {
        for response in [json!({ "objects": null }), json!({ "objects": [] }), json!({})] {
            let err = parse_address(&response).unwrap_err();
            assert_eq!(err.upstream_kind(), Some(UpstreamFailure::AddressLoadFailed));
        }
    }
}
