//! sevDesk HTTP 客户端
//!
//! 令牌通过 `Authorization` 头发送, 不出现在 URL 中; 传输错误在上抛前去掉 URL。

use super::{ApiToken, ContactService, VoucherService};
use crate::error::{ImportError, UpstreamFailure};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, PRAGMA};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://my.sevdesk.de/api/v1";

#[derive(Debug, Clone)]
pub struct SevdeskClient {
    http: reqwest::Client,
    base_url: String,
    token: ApiToken,
}

impl SevdeskClient {
    pub fn new(base_url: impl Into<String>, token: ApiToken, timeout: Duration) -> Result<Self, ImportError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("voucher-import/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ImportError::validation(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, self.token.expose())
            .header(ACCEPT, "application/json")
            .header(PRAGMA, "no-cache")
            .header(CACHE_CONTROL, "no-cache")
    }

    async fn send(&self, kind: UpstreamFailure, request: RequestBuilder) -> Result<Value, ImportError> {
        let response = request.send().await.map_err(|e| transport_error(kind, e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(kind, e))?;

        if let Some(err) = status_error(kind, status, &body) {
            return Err(err);
        }

        serde_json::from_str(&body)
            .map_err(|e| ImportError::upstream(kind, format!("invalid JSON ({}): {}", e, body)))
    }
}

/// 非 2xx 响应转为错误; 401/403 为认证失败
fn status_error(kind: UpstreamFailure, status: StatusCode, body: &str) -> Option<ImportError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        tracing::warn!("upstream rejected credentials: HTTP {}", status.as_u16());
        return Some(ImportError::authentication(format!("HTTP {}: {}", status.as_u16(), body)));
    }

    if !status.is_success() {
        return Some(ImportError::upstream(kind, format!("HTTP {}: {}", status.as_u16(), body)));
    }

    None
}

fn transport_error(kind: UpstreamFailure, err: reqwest::Error) -> ImportError {
    let err = err.without_url();
    if err.is_timeout() {
        ImportError::upstream(UpstreamFailure::Timeout, err.to_string())
    } else {
        ImportError::upstream(kind, err.to_string())
    }
}

/// 根据扩展名推断上传文件的 Content-Type
fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ContactService for SevdeskClient {
    async fn list_contacts(&self, offset: usize, limit: usize) -> Result<Value, ImportError> {
        let request = self.request(Method::GET, "/Contact").query(&[
            ("depth", "true".to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("orderBy[0][field]", "create".to_string()),
            ("orderBy[0][arrangement]", "asc".to_string()),
        ]);
        self.send(UpstreamFailure::ContactLoadFailed, request).await
    }

    async fn contact_address(&self, contact_id: &str) -> Result<Value, ImportError> {
        let request = self.request(Method::GET, &format!("/Contact/{}/getMainAddress", contact_id));
        self.send(UpstreamFailure::AddressLoadFailed, request).await
    }
}

#[async_trait]
impl VoucherService for SevdeskClient {
    async fn upload_temp_file(&self, cft: &str, path: &Path) -> Result<Value, ImportError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ImportError::validation(format!("failed to read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type(path))
            .map_err(|e| transport_error(UpstreamFailure::UploadFailed, e))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self
            .request(Method::POST, "/Voucher/Factory/uploadTempFile")
            .query(&[("cft", cft)])
            .multipart(form);
        self.send(UpstreamFailure::UploadFailed, request).await
    }

    async fn extract(&self, cft: &str, remote_filename: &str) -> Result<Value, ImportError> {
        let request = self
            .request(Method::GET, "/Voucher/Factory/extractThumb")
            .query(&[("cft", cft), ("fileName", remote_filename)]);
        self.send(UpstreamFailure::ExtractionFailed, request).await
    }

    async fn client_profile(&self) -> Result<Value, ImportError> {
        let request = self.request(Method::GET, "/SevClient");
        self.send(UpstreamFailure::ProfileLoadFailed, request).await
    }

    async fn estimate_accounting_type(&self, request: &Value) -> Result<Value, ImportError> {
        let request = self
            .request(Method::POST, "/Voucher/Factory/estimateAccountingType")
            .json(request);
        self.send(UpstreamFailure::ClassificationFailed, request).await
    }

    async fn save_voucher(&self, cft: &str, form: &[(String, String)]) -> Result<Value, ImportError> {
        let request = self
            .request(Method::POST, "/Voucher/Factory/saveVoucher")
            .query(&[("cft", cft)])
            .form(form);
        self.send(UpstreamFailure::SaveFailed, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_the_token() {
        let token = ApiToken::new("1ll3galt0ken-secret").unwrap();
        let client = SevdeskClient::new(DEFAULT_BASE_URL, token, Duration::from_secs(5)).unwrap();
        let debug = format!("{:?}", client);

        assert!(!debug.contains("1ll3galt0ken-secret"));
        assert!(debug.contains("my.sevdesk.de"));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let token = ApiToken::new("t").unwrap();
        let client = SevdeskClient::new("http://localhost:9000/api/v1/", token, Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/api/v1");
    }

    #[test]
    fn rejected_credentials_keep_a_bounded_message() {
        let body = "<html>".repeat(1000);
        let err = status_error(UpstreamFailure::SaveFailed, StatusCode::UNAUTHORIZED, &body).unwrap();

        let ImportError::Authentication(message) = &err else {
            panic!("expected authentication error, got {:?}", err);
        };
        assert!(message.starts_with("HTTP 401: <html>"));
        assert!(message.len() < 600);
    }

    #[test]
    fn other_statuses_map_to_the_calling_step() {
        let err = status_error(UpstreamFailure::SaveFailed, StatusCode::BAD_GATEWAY, "down").unwrap();
        assert_eq!(err.upstream_kind(), Some(UpstreamFailure::SaveFailed));
        assert!(status_error(UpstreamFailure::SaveFailed, StatusCode::OK, "{}").is_none());
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type(Path::new("R1001.PDF")), "application/pdf");
        assert_eq!(content_type(Path::new("scan.jpeg")), "image/jpeg");
        assert_eq!(content_type(Path::new("noext")), "application/octet-stream");
    }
}
