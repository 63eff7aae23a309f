use super::wire;
use serde::{Deserialize, Serialize};

/// 联系人 (往来单位)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub name: String,
    /// 第二名称/商号
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub name2: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub bank_account: Option<String>,
}

/// 联系人主地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub zip: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub city: Option<String>,
    #[serde(default, rename = "country", deserialize_with = "wire::opt_id")]
    pub country_id: Option<String>,
}

/// 当前账套 (客户自身) 信息, 每个导入器只加载一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfile {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub name: String,
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub bank_iban: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub address_country: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub form_of_company: Option<String>,
    /// 科目表, 例如 `skr03`
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub chart_of_accounts: Option<String>,
}
