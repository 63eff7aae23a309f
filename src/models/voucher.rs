use super::{ClassificationResult, ContactRecord, ExtractionSet, IssuerCandidateList};
use crate::cache::CacheSource;
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// 未识别到税率时的默认税率
pub const DEFAULT_TAX_RATE: &str = "19";
/// 未识别到开票方名称时的占位名称
pub const UNKNOWN_SUPPLIER_NAME: &str = "???";

/// 供应商: 已解析的联系人, 或仅有识别出的名称
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SupplierRef {
    Contact(String),
    Name(String),
}

/// 待保存的凭证草稿
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherDraft {
    pub voucher_date: String,
    pub description: String,
    /// 原始识别响应, 原样回传
    pub extraction_response: String,
    pub iban: Option<String>,
    pub tax_rate: String,
    pub sum: BigDecimal,
    pub supplier: SupplierRef,
    pub accounting_type_id: Option<String>,
    pub remote_filename: String,
}

impl VoucherDraft {
    pub fn build(
        extractions: &ExtractionSet,
        extraction_response: &Value,
        remote_filename: &str,
        issuer: Option<&ContactRecord>,
        classification: Option<&ClassificationResult>,
        today: NaiveDate,
    ) -> Self {
        let supplier = match issuer {
            Some(contact) => SupplierRef::Contact(contact.id.clone()),
            None => SupplierRef::Name(
                extractions
                    .creditor_name()
                    .unwrap_or(UNKNOWN_SUPPLIER_NAME)
                    .to_string(),
            ),
        };

        Self {
            voucher_date: extractions
                .invoice_date()
                .map(str::to_string)
                .unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
            description: extractions.invoice_number().unwrap_or_default().to_string(),
            extraction_response: extraction_response.to_string(),
            iban: extractions.iban().map(str::to_string),
            tax_rate: extractions
                .value(super::field::TAX_RATE)
                .unwrap_or(DEFAULT_TAX_RATE)
                .to_string(),
            // 行金额缺失或无法解析时为 0 (与预估请求不同)
            sum: extractions.net_amount().unwrap_or_else(BigDecimal::zero),
            supplier,
            accounting_type_id: classification.map(|c| c.id.clone()),
            remote_filename: remote_filename.to_string(),
        }
    }

    /// 转为保存接口的表单字段
    pub fn to_form_fields(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = vec![
            ("voucher[voucherDate]".into(), self.voucher_date.clone()),
            ("voucher[description]".into(), self.description.clone()),
            ("voucher[resultDisdar]".into(), self.extraction_response.clone()),
            ("voucher[status]".into(), "50".into()), // 草稿
            ("voucher[taxType]".into(), "default".into()),
            ("voucher[creditDebit]".into(), "C".into()),
            ("voucher[voucherType]".into(), "VOU".into()),
            ("voucher[tip]".into(), "0".into()),
            ("voucher[mileageRate]".into(), "0".into()),
            ("voucher[selectedForPaymentFile]".into(), "0".into()),
            ("voucher[objectName]".into(), "Voucher".into()),
            ("voucher[mapAll]".into(), "true".into()),
            ("voucherPosSave[0][taxRate]".into(), self.tax_rate.clone()),
            ("voucherPosSave[0][sum]".into(), self.sum.to_string()),
            ("voucherPosSave[0][objectName]".into(), "VoucherPos".into()),
            ("voucherPosSave[0][mapAll]".into(), "true".into()),
            ("filename".into(), self.remote_filename.clone()),
            ("existenceCheck".into(), "true".into()),
        ];

        if let Some(iban) = &self.iban {
            fields.push(("voucher[iban]".into(), iban.clone()));
        }

        if let Some(id) = &self.accounting_type_id {
            fields.push(("voucherPosSave[0][accountingType][id]".into(), id.clone()));
            fields.push((
                "voucherPosSave[0][accountingType][objectName]".into(),
                "AccountingType".into(),
            ));
        }

        match &self.supplier {
            SupplierRef::Contact(id) => {
                fields.push(("voucher[supplier][id]".into(), id.clone()));
                fields.push(("voucher[supplier][objectName]".into(), "Contact".into()));
            }
            SupplierRef::Name(name) => {
                fields.push(("voucher[supplierName]".into(), name.clone()));
            }
        }

        fields
    }
}

/// 一次导入的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    /// 关联令牌
    pub cft: String,
    pub document_id: String,
    pub issuer: Option<ContactRecord>,
    pub candidates: IssuerCandidateList,
    pub classification: Option<ClassificationResult>,
    pub extractions: ExtractionSet,
    pub directory_source: CacheSource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{field, ExtractedField};
    use serde_json::json;

    fn set(fields: &[(&str, &str)]) -> ExtractionSet {
        let mut set = ExtractionSet::new();
        for (t, v) in fields {
            set.offer(ExtractedField {
                field_type: t.to_string(),
                value: v.to_string(),
                confidence: 1.0,
            });
        }
        set
    }

    fn lookup<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
        fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn unresolved_issuer_falls_back_to_supplier_name() {
        let extractions = set(&[(field::CREDITOR_NAME, "Unknown GmbH")]);
        let draft = VoucherDraft::build(&extractions, &json!({}), "tmp.pdf", None, None, today());
        let form = draft.to_form_fields();

        assert_eq!(lookup(&form, "voucher[supplierName]"), Some("Unknown GmbH"));
        assert_eq!(lookup(&form, "voucher[supplier][id]"), None);
        assert_eq!(lookup(&form, "voucherPosSave[0][accountingType][id]"), None);
    }

    #[test]
    fn defaults_apply_when_nothing_was_extracted() {
        let draft = VoucherDraft::build(&ExtractionSet::new(), &json!({}), "tmp.pdf", None, None, today());
        let form = draft.to_form_fields();

        assert_eq!(lookup(&form, "voucher[voucherDate]"), Some("2024-03-01"));
        assert_eq!(lookup(&form, "voucher[description]"), Some(""));
        assert_eq!(lookup(&form, "voucherPosSave[0][taxRate]"), Some("19"));
        assert_eq!(lookup(&form, "voucherPosSave[0][sum]"), Some("0"));
        assert_eq!(lookup(&form, "voucher[supplierName]"), Some("???"));
        assert_eq!(lookup(&form, "voucher[iban]"), None);
    }

    #[test]
    fn resolved_issuer_and_classification_are_referenced_by_id() {
        let extractions = set(&[
            (field::NET_AMOUNT, "10000"),
            (field::INVOICE_NUMBER, "R-1001"),
            (field::IBAN, "DE89370400440532013000"),
        ]);
        let issuer = ContactRecord {
            id: "55".into(),
            name: "Acme Corp".into(),
            name2: None,
            bank_account: None,
        };
        let classification = ClassificationResult {
            id: "26".into(),
            name: "Bürobedarf".into(),
            chart_code: Some("4930".into()),
        };
        let draft = VoucherDraft::build(
            &extractions,
            &json!({"objects": {}}),
            "abc.pdf",
            Some(&issuer),
            Some(&classification),
            today(),
        );
        let form = draft.to_form_fields();

        assert_eq!(lookup(&form, "voucher[supplier][id]"), Some("55"));
        assert_eq!(lookup(&form, "voucher[supplierName]"), None);
        assert_eq!(lookup(&form, "voucherPosSave[0][accountingType][id]"), Some("26"));
        assert_eq!(lookup(&form, "voucherPosSave[0][sum]"), Some("100"));
        assert_eq!(lookup(&form, "voucher[description]"), Some("R-1001"));
        assert_eq!(lookup(&form, "voucher[iban]"), Some("DE89370400440532013000"));
        assert_eq!(lookup(&form, "filename"), Some("abc.pdf"));
    }
}
