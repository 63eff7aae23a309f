use crate::cache::SharedCache;
use crate::error::ImportError;
use crate::models::ImportOutcome;
use crate::service::{ImportSettings, VoucherImporter};
use crate::upstream::VoucherService;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 共享状态: 上游客户端 + 进程级缓存
pub struct AppState<S: VoucherService + 'static> {
    pub service: Arc<S>,
    pub cache: Arc<SharedCache>,
    pub settings: ImportSettings,
}

impl<S: VoucherService + 'static> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache: Arc::clone(&self.cache),
            settings: self.settings.clone(),
        }
    }
}

/// 请求体: 本地文件路径
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub file_path: String,
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    pub outcome: Option<ImportOutcome>,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 导入单个凭证文件, 每个请求使用一个新的导入器
pub async fn import_voucher<S: VoucherService + 'static>(
    State(state): State<AppState<S>>,
    Json(req): Json<ImportRequest>,
) -> Response {
    let importer = VoucherImporter::new(
        Arc::clone(&state.service),
        Arc::clone(&state.cache),
        state.settings.clone(),
    );

    match importer.import_local_file(&req.file_path).await {
        Ok(outcome) => {
            let response = ImportResponse {
                success: true,
                message: format!("Successfully saved voucher {}", outcome.document_id),
                outcome: Some(outcome),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("Import of {} failed: {}", req.file_path, e);
            let response = ImportResponse {
                success: false,
                message: format!("Error: {}", e),
                outcome: None,
            };
            (status_for(&e), Json(response)).into_response()
        }
    }
}

fn status_for(err: &ImportError) -> StatusCode {
    match err {
        ImportError::Validation(_) => StatusCode::BAD_REQUEST,
        ImportError::Authentication(_) => StatusCode::UNAUTHORIZED,
        ImportError::Reuse => StatusCode::CONFLICT,
        ImportError::Upstream { .. } => StatusCode::BAD_GATEWAY,
    }
}
