//! 外部协作方
//!
//! 核心流程只依赖这里的 trait; 协作方返回原始 JSON 信封, 结构校验在核心中完成。

pub mod auth;
pub mod client;

pub use auth::ApiToken;
pub use client::SevdeskClient;

use crate::error::{ImportError, UpstreamFailure};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// 默认的单次上游调用超时
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// 联系人目录服务
#[async_trait]
pub trait ContactService: Debug + Send + Sync {
    /// 按创建时间升序分页列出联系人
    async fn list_contacts(&self, offset: usize, limit: usize) -> Result<Value, ImportError>;

    /// 联系人主地址
    async fn contact_address(&self, contact_id: &str) -> Result<Value, ImportError>;
}

/// 凭证导入所需的全部上游服务
#[async_trait]
pub trait VoucherService: ContactService {
    /// 上传临时文件, 响应中包含远程文件名
    async fn upload_temp_file(&self, cft: &str, path: &Path) -> Result<Value, ImportError>;

    /// 对已上传文件进行识别
    async fn extract(&self, cft: &str, remote_filename: &str) -> Result<Value, ImportError>;

    async fn client_profile(&self) -> Result<Value, ImportError>;

    async fn estimate_accounting_type(&self, request: &Value) -> Result<Value, ImportError>;

    async fn save_voucher(&self, cft: &str, form: &[(String, String)]) -> Result<Value, ImportError>;
}

/// 为上游调用加超时, 超时即本次导入失败
pub async fn with_timeout<T, F>(step: &str, limit: Duration, fut: F) -> Result<T, ImportError>
where
    F: Future<Output = Result<T, ImportError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("✗ {} timed out (>{:?})", step, limit);
            Err(ImportError::upstream(
                UpstreamFailure::Timeout,
                format!("{} exceeded {:?}", step, limit),
            ))
        }
    }
}
