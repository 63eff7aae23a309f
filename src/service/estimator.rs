use super::ImportSettings;
use crate::error::{ImportError, UpstreamFailure};
use crate::models::{
    wire, Address, ClassificationResult, ClientProfile, ContactRecord, EstimationRequest, ExtractionSet,
};
use crate::upstream::{with_timeout, VoucherService};
use serde_json::Value;
use std::sync::Arc;

/// 凭证方向: 贷方 (收到的发票)
pub const CREDIT_DEBIT: &str = "C";

/// 记账类型预估
pub struct ClassificationEstimator {
    service: Arc<dyn VoucherService>,
    settings: ImportSettings,
}

impl ClassificationEstimator {
    pub fn new(service: Arc<dyn VoucherService>, settings: ImportSettings) -> Self {
        Self { service, settings }
    }

    pub async fn estimate(
        &self,
        issuer: &ContactRecord,
        extractions: &ExtractionSet,
        profile: &ClientProfile,
        address: Option<&Address>,
    ) -> Result<ClassificationResult, ImportError> {
        let request = build_request(issuer, extractions, profile, address);
        let body = serde_json::to_value(&request).map_err(|e| {
            ImportError::upstream(UpstreamFailure::ClassificationFailed, format!("cannot encode request: {}", e))
        })?;

        let response = with_timeout(
            "estimate accounting type",
            self.settings.call_timeout,
            self.service.estimate_accounting_type(&body),
        )
        .await?;

        let result = parse_estimation(&response, profile.chart_of_accounts.as_deref())?;
        match &result.chart_code {
            Some(code) => tracing::info!(
                "Estimated accounting type: {} (#{}), {} code {}",
                result.name,
                result.id,
                profile.chart_of_accounts.as_deref().unwrap_or_default(),
                code
            ),
            None => tracing::info!("Estimated accounting type: {} (#{})", result.name, result.id),
        }

        Ok(result)
    }
}

/// 数值字段缺失或无法解析时为空, 不补 0
pub fn build_request(
    issuer: &ContactRecord,
    extractions: &ExtractionSet,
    profile: &ClientProfile,
    address: Option<&Address>,
) -> EstimationRequest {
    EstimationRequest {
        client_id: profile.id.clone(),
        client_country: profile.address_country.clone(),
        form_of_company: profile.form_of_company.clone(),
        credit_debit: CREDIT_DEBIT,
        net_amount: extractions.net_amount(),
        tax_rate: extractions.tax_rate(),
        supplier_id: issuer.id.clone(),
        supplier_name: issuer.name.clone(),
        supplier_country: address.and_then(|a| a.country_id.clone()),
    }
}

/// 响应中客户科目表的 key 位于第一个之后时, 同时取出科目编码
pub fn parse_estimation(response: &Value, chart_of_accounts: Option<&str>) -> Result<ClassificationResult, ImportError> {
    let object = wire::objects(response)
        .and_then(Value::as_object)
        .ok_or_else(|| ImportError::malformed(UpstreamFailure::ClassificationFailed, "accounting type", response))?;

    let id = object
        .get("id")
        .and_then(wire::reference_id)
        .ok_or_else(|| ImportError::malformed(UpstreamFailure::ClassificationFailed, "accounting type id", response))?;
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let chart_code = chart_of_accounts.and_then(|chart| {
        let index = object.keys().position(|k| k == chart)?;
        if index == 0 {
            return None;
        }
        match object.get(chart)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    });

    Ok(ClassificationResult { id, name, chart_code })
}
