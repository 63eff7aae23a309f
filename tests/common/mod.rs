#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;
use voucher_import_rust::upstream::{ContactService, VoucherService};
use voucher_import_rust::ImportError;

/// 内存中的上游服务, 记录每类调用次数
#[derive(Debug)]
pub struct FakeBackend {
    pub contacts: Vec<Value>,
    pub profile: Value,
    pub addresses: HashMap<String, Value>,
    pub address_error: Option<ImportError>,
    pub upload_response: Value,
    pub upload_error: Option<ImportError>,
    pub extraction_response: Value,
    pub estimate_response: Value,
    pub save_response: Value,
    pub malformed_contact_page: bool,
    /// 总是返回第一页, 模拟不理会 offset 的上游
    pub ignore_offset: bool,
    pub page_delay: Option<Duration>,

    pub list_calls: AtomicUsize,
    pub address_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub extract_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub save_calls: AtomicUsize,

    pub estimate_requests: Mutex<Vec<Value>>,
    pub saved_forms: Mutex<Vec<Vec<(String, String)>>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            contacts: Vec::new(),
            profile: json!({ "objects": [{
                "id": "100",
                "name": "MyCo",
                "bankIban": "DE02 1203 0000 0000 2020 51",
                "addressCountry": { "id": "1", "objectName": "StaticCountry" },
                "formOfCompany": "2",
                "chartOfAccounts": "skr03"
            }]}),
            addresses: HashMap::new(),
            address_error: None,
            upload_response: json!({ "objects": { "filename": "remote-abc.pdf" } }),
            upload_error: None,
            extraction_response: extractions(&[]),
            estimate_response: json!({ "objects": { "id": "26", "name": "Bürobedarf", "skr03": "4930", "skr04": "6815" } }),
            save_response: json!({ "objects": { "document": { "id": 9001 } } }),
            malformed_contact_page: false,
            ignore_offset: false,
            page_delay: None,
            list_calls: AtomicUsize::new(0),
            address_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            extract_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
            estimate_requests: Mutex::new(Vec::new()),
            saved_forms: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn with_contacts(contacts: Vec<Value>) -> Self {
        Self {
            contacts,
            ..Self::default()
        }
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        [
            &self.list_calls,
            &self.address_calls,
            &self.upload_calls,
            &self.extract_calls,
            &self.profile_calls,
            &self.estimate_calls,
            &self.save_calls,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }

    pub fn last_form(&self) -> Vec<(String, String)> {
        self.saved_forms.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ContactService for FakeBackend {
    async fn list_contacts(&self, offset: usize, limit: usize) -> Result<Value, ImportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }
        if self.malformed_contact_page {
            return Ok(json!({ "objects": { "error": "unexpected" } }));
        }

        let offset = if self.ignore_offset { 0 } else { offset };
        let start = offset.min(self.contacts.len());
        let end = (offset + limit).min(self.contacts.len());
        Ok(json!({ "objects": self.contacts[start..end].to_vec() }))
    }

    async fn contact_address(&self, contact_id: &str) -> Result<Value, ImportError> {
        self.address_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.address_error {
            return Err(err.clone());
        }
        Ok(self
            .addresses
            .get(contact_id)
            .cloned()
            .unwrap_or_else(|| json!({ "objects": null })))
    }
}

#[async_trait]
impl VoucherService for FakeBackend {
    async fn upload_temp_file(&self, _cft: &str, _path: &Path) -> Result<Value, ImportError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.upload_error {
            return Err(err.clone());
        }
        Ok(self.upload_response.clone())
    }

    async fn extract(&self, _cft: &str, _remote_filename: &str) -> Result<Value, ImportError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.extraction_response.clone())
    }

    async fn client_profile(&self) -> Result<Value, ImportError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.profile.clone())
    }

    async fn estimate_accounting_type(&self, request: &Value) -> Result<Value, ImportError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.estimate_requests.lock().unwrap().push(request.clone());
        Ok(self.estimate_response.clone())
    }

    async fn save_voucher(&self, _cft: &str, form: &[(String, String)]) -> Result<Value, ImportError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.saved_forms.lock().unwrap().push(form.to_vec());
        Ok(self.save_response.clone())
    }
}

pub fn contact(id: u64, name: &str, name2: Option<&str>, bank_account: Option<&str>) -> Value {
    json!({
        "id": id.to_string(),
        "objectName": "Contact",
        "name": name,
        "name2": name2,
        "bankAccount": bank_account,
    })
}

pub fn numbered_contacts(count: u64) -> Vec<Value> {
    (1..=count)
        .map(|i| contact(i, &format!("Contact {}", i), None, None))
        .collect()
}

/// 识别响应: 每个字段一个分组
pub fn extractions(fields: &[(&str, &str, f64)]) -> Value {
    let groups: Vec<Value> = fields
        .iter()
        .map(|(t, v, c)| json!({ "labels": [{ "type": t, "value": v, "confidence": c }] }))
        .collect();
    json!({ "objects": { "extractions": groups } })
}

pub fn scan_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("R1001")
        .suffix(".pdf")
        .tempfile()
        .unwrap();
    file.write_all(b"%PDF-1.4\n%fake\n").unwrap();
    file
}

pub fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}
