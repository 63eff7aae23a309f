//! 上游 JSON 的宽松字段解析: id 可能是字符串也可能是数字, 引用可能是 `{id, objectName}` 对象,
//! 空字段可能是 `null` 也可能是 `""`。

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 从字符串/数字/引用对象中取出 id
pub fn reference_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("id").and_then(reference_id),
        _ => None,
    }
}

pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    reference_id(&value).ok_or_else(|| D::Error::custom(format!("expected id, got {}", value)))
}

pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(reference_id))
}

/// `null` 视为空字符串
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` 和 `""` 都视为缺失
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// 取出响应信封中的 `objects`
pub fn objects(response: &Value) -> Option<&Value> {
    response.get("objects").filter(|v| !v.is_null())
}
