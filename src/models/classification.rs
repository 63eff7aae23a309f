use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// 记账类型预估结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// 通用记账类型 id, 保存凭证时使用
    pub id: String,
    pub name: String,
    /// 客户科目表下的科目编码, 仅用于展示/日志
    pub chart_code: Option<String>,
}

/// 预估请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationRequest {
    pub client_id: String,
    pub client_country: Option<String>,
    pub form_of_company: Option<String>,
    pub credit_debit: &'static str,
    pub net_amount: Option<BigDecimal>,
    pub tax_rate: Option<BigDecimal>,
    pub supplier_id: String,
    pub supplier_name: String,
    pub supplier_country: Option<String>,
}
