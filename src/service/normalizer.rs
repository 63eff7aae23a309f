use crate::error::{ImportError, UpstreamFailure};
use crate::models::{wire, ExtractedField, ExtractionSet};
use serde_json::Value;

/// 把识别服务响应中的候选标签归并为每种字段一个最佳值
///
/// `extractions` 必须是数组, 否则视为响应结构错误; 没有 `labels` 数组的分组直接忽略。
pub fn normalize_extractions(response: &Value) -> Result<ExtractionSet, ImportError> {
    let groups = wire::objects(response)
        .and_then(|o| o.get("extractions"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ImportError::malformed(
                UpstreamFailure::MalformedExtractionResponse,
                "objects.extractions",
                response,
            )
        })?;

    let mut set = ExtractionSet::new();
    for group in groups {
        let Some(labels) = group.get("labels").and_then(Value::as_array) else {
            continue;
        };

        for label in labels {
            if let Some(field) = parse_label(label) {
                set.offer(field);
            }
        }
    }

    tracing::debug!("normalized {} groups into {} fields", groups.len(), set.len());
    Ok(set)
}

fn parse_label(label: &Value) -> Option<ExtractedField> {
    let field_type = label.get("type")?.as_str()?.to_string();
    let value = match label.get("value")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let confidence = match label.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };

    Some(ExtractedField {
        field_type,
        value,
        confidence,
    })
}
