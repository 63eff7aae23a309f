use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 识别服务使用的字段类型
pub mod field {
    pub const CREDITOR_NAME: &str = "CREDITORNAME";
    pub const IBAN: &str = "IBAN";
    pub const INVOICE_DATE: &str = "INVOICEDATE";
    pub const INVOICE_NUMBER: &str = "INVOICENUMBER";
    pub const TAX_RATE: &str = "TAXRATE";
    pub const NET_AMOUNT: &str = "NETAMOUNT";
}

/// 单个识别结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub value: String,
    pub confidence: f64,
}

/// 每种字段类型只保留置信度最高的一条, 按首次出现顺序排列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionSet {
    fields: IndexMap<String, ExtractedField>,
}

impl ExtractionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 置信度严格更高才替换; 相等时保留先出现的
    pub fn offer(&mut self, candidate: ExtractedField) {
        match self.fields.get_mut(&candidate.field_type) {
            Some(existing) => {
                if candidate.confidence > existing.confidence {
                    *existing = candidate;
                }
            }
            None => {
                self.fields.insert(candidate.field_type.clone(), candidate);
            }
        }
    }

    pub fn get(&self, field_type: &str) -> Option<&ExtractedField> {
        self.fields.get(field_type)
    }

    /// 字段值, 空白值视为缺失
    pub fn value(&self, field_type: &str) -> Option<&str> {
        self.get(field_type)
            .map(|f| f.value.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn creditor_name(&self) -> Option<&str> {
        self.value(field::CREDITOR_NAME)
    }

    pub fn iban(&self) -> Option<&str> {
        self.value(field::IBAN)
    }

    pub fn invoice_date(&self) -> Option<&str> {
        self.value(field::INVOICE_DATE)
    }

    pub fn invoice_number(&self) -> Option<&str> {
        self.value(field::INVOICE_NUMBER)
    }

    /// 净额: 识别结果以分为单位, 只取开头的整数部分 (`"123.45"` 为 123 分, `"12345abc"` 为 12345 分)
    pub fn net_amount(&self) -> Option<BigDecimal> {
        let raw = self.value(field::NET_AMOUNT)?.trim_start();
        let (sign, digits) = match raw.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", raw.strip_prefix('+').unwrap_or(raw)),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        if end == 0 {
            return None;
        }

        let cents = BigDecimal::from_str(&format!("{}{}", sign, &digits[..end])).ok()?;
        Some(cents / BigDecimal::from(100))
    }

    pub fn tax_rate(&self) -> Option<BigDecimal> {
        BigDecimal::from_str(self.value(field::TAX_RATE)?.trim()).ok()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedField> {
        self.fields.values()
    }

    /// 日志摘要: `TYPE="value", ...`
    pub fn summary(&self) -> String {
        self.iter()
            .map(|f| format!("{}=\"{}\"", f.field_type, f.value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(field_type: &str, value: &str, confidence: f64) -> ExtractedField {
        ExtractedField {
            field_type: field_type.to_string(),
            value: value.to_string(),
            confidence,
        }
    }

    #[test]
    fn net_amount_is_converted_from_cents() {
        let mut set = ExtractionSet::new();
        set.offer(ex(field::NET_AMOUNT, "12345", 0.9));
        assert_eq!(set.net_amount(), Some(BigDecimal::from_str("123.45").unwrap()));
    }

    #[test]
    fn net_amount_uses_the_leading_integer_only() {
        let amount = |raw: &str| {
            let mut set = ExtractionSet::new();
            set.offer(ex(field::NET_AMOUNT, raw, 0.9));
            set.net_amount()
        };

        assert_eq!(amount("123.45"), Some(BigDecimal::from_str("1.23").unwrap()));
        assert_eq!(amount("12345abc"), Some(BigDecimal::from_str("123.45").unwrap()));
        assert_eq!(amount("  -500"), Some(BigDecimal::from(-5)));
        assert_eq!(amount("+250 EUR"), Some(BigDecimal::from_str("2.5").unwrap()));
        assert_eq!(amount("EUR 250"), None);
        assert_eq!(amount("-"), None);
    }

    #[test]
    fn unparseable_numbers_are_absent_not_zero() {
        let mut set = ExtractionSet::new();
        set.offer(ex(field::NET_AMOUNT, "twelve", 0.9));
        set.offer(ex(field::TAX_RATE, "19%", 0.9));
        assert_eq!(set.net_amount(), None);
        assert_eq!(set.tax_rate(), None);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut set = ExtractionSet::new();
        set.offer(ex(field::CREDITOR_NAME, "   ", 0.9));
        assert!(set.get(field::CREDITOR_NAME).is_some());
        assert_eq!(set.creditor_name(), None);
    }
}
