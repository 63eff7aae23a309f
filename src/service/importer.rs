use super::{normalize_extractions, resolve_issuer, AddressCache, ClassificationEstimator, ContactDirectory, ImportSettings};
use crate::cache::SharedCache;
use crate::error::{ImportError, UpstreamFailure};
use crate::models::{
    wire, Address, ClassificationResult, ClientProfile, ContactRecord, ExtractionSet, ImportOutcome, VoucherDraft,
};
use crate::upstream::{with_timeout, ContactService, VoucherService};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::Instrument;

/// 凭证导入器 (一次性)
///
/// 顺序执行: 文件检查 → 上传 → 识别 → 账套信息 → 联系人目录 → 开票方解析 → 地址 → 记账类型预估 → 保存。
/// 同一实例第二次调用 `import_local_file` 总是返回 [`ImportError::Reuse`]。
pub struct VoucherImporter<S: VoucherService + 'static> {
    service: Arc<S>,
    cache: Arc<SharedCache>,
    settings: ImportSettings,
    used: AtomicBool,
    profile: OnceCell<Arc<ClientProfile>>,
}

impl<S: VoucherService + 'static> VoucherImporter<S> {
    pub fn new(service: Arc<S>, cache: Arc<SharedCache>, settings: ImportSettings) -> Self {
        Self {
            service,
            cache,
            settings,
            used: AtomicBool::new(false),
            profile: OnceCell::new(),
        }
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::SeqCst)
    }

    pub async fn import_local_file(&self, path: impl AsRef<Path>) -> Result<ImportOutcome, ImportError> {
        if self.used.swap(true, Ordering::SeqCst) {
            return Err(ImportError::Reuse);
        }

        let cft = uuid::Uuid::new_v4().simple().to_string();
        let span = tracing::info_span!("import", cft = %cft);
        self.run(cft, path.as_ref()).instrument(span).await
    }

    async fn run(&self, cft: String, path: &Path) -> Result<ImportOutcome, ImportError> {
        let started = std::time::Instant::now();

        // 1. 文件检查 (任何网络请求之前)
        tracing::info!("Checking file: {} ...", path.display());
        check_local_file(path, self.settings.import_root.as_deref()).await?;

        // 2. 上传
        tracing::info!("Uploading file: {} ...", path.display());
        let response = self
            .bounded("upload file", self.service.upload_temp_file(&cft, path))
            .await?;
        let remote_filename = wire::objects(&response)
            .and_then(|o| o.get("filename"))
            .and_then(Value::as_str)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ImportError::malformed(UpstreamFailure::UploadFailed, "filename", &response))?;
        tracing::info!("Successfully uploaded as {}", remote_filename);

        // 3. 识别
        tracing::info!("Extracting information...");
        let extraction_response = self
            .bounded("extract information", self.service.extract(&cft, &remote_filename))
            .await?;
        let extractions = normalize_extractions(&extraction_response)?;
        tracing::info!("Successfully extracted information: {}", extractions.summary());

        // 4. 账套 + 联系人目录
        let profile = self.client_profile().await?;
        let contacts: Arc<dyn ContactService> = Arc::clone(&self.service) as Arc<dyn ContactService>;
        let directory = ContactDirectory::new(
            profile.id.as_str(),
            Arc::clone(&contacts),
            Arc::clone(&self.cache),
            self.settings.clone(),
        );
        let snapshot = directory.load_all().await?;

        // 5. 开票方解析
        let candidates = resolve_issuer(&extractions, &snapshot.contacts, &profile);
        let issuer = candidates.issuer().cloned();

        // 6. 地址 + 记账类型预估 (仅在解析到开票方时)
        let classification = match &issuer {
            Some(issuer) => {
                let addresses = AddressCache::new(contacts, Arc::clone(&self.cache), self.settings.clone());
                let address = self.issuer_address(&addresses, &profile.id, &issuer.id).await?;
                let estimator = ClassificationEstimator::new(
                    Arc::clone(&self.service) as Arc<dyn VoucherService>,
                    self.settings.clone(),
                );
                Some(
                    estimator
                        .estimate(issuer, &extractions, &profile, address.as_deref())
                        .await?,
                )
            }
            None => {
                tracing::info!("Skipping classification; no issuer contact resolved");
                None
            }
        };

        // 7. 保存
        tracing::info!("Saving voucher...");
        let document_id = self
            .save(&cft, &extractions, &extraction_response, &remote_filename, issuer.as_ref(), classification.as_ref())
            .await?;

        tracing::info!(
            "Successfully saved voucher: {} (issuer: {}, 耗时: {:?})",
            document_id,
            issuer.as_ref().map(|c| c.id.as_str()).unwrap_or("-"),
            started.elapsed()
        );

        Ok(ImportOutcome {
            cft,
            document_id,
            issuer,
            candidates,
            classification,
            extractions,
            directory_source: snapshot.source,
        })
    }

    /// 账套信息在实例内只加载一次
    async fn client_profile(&self) -> Result<Arc<ClientProfile>, ImportError> {
        let profile = self
            .profile
            .get_or_try_init(|| async {
                let response = self.bounded("load client profile", self.service.client_profile()).await?;
                parse_profile(&response).map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(profile))
    }

    /// 地址加载失败降级为"国家未知"; 认证失败和超时仍然终止导入
    async fn issuer_address(
        &self,
        addresses: &AddressCache,
        client_id: &str,
        contact_id: &str,
    ) -> Result<Option<Arc<Address>>, ImportError> {
        match addresses.load_address(client_id, contact_id).await {
            Ok(address) => Ok(Some(address)),
            Err(e) if e.degrades_to_unknown_country() => {
                tracing::warn!("Address of contact #{} unavailable, country unknown: {}", contact_id, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn save(
        &self,
        cft: &str,
        extractions: &ExtractionSet,
        extraction_response: &Value,
        remote_filename: &str,
        issuer: Option<&ContactRecord>,
        classification: Option<&ClassificationResult>,
    ) -> Result<String, ImportError> {
        let draft = VoucherDraft::build(
            extractions,
            extraction_response,
            remote_filename,
            issuer,
            classification,
            chrono::Local::now().date_naive(),
        );
        let form = draft.to_form_fields();

        let response = self
            .bounded("save voucher", self.service.save_voucher(cft, &form))
            .await?;

        wire::objects(&response)
            .and_then(|o| o.get("document"))
            .and_then(|d| d.get("id"))
            .and_then(wire::reference_id)
            .ok_or_else(|| ImportError::malformed(UpstreamFailure::SaveFailed, "document", &response))
    }

    async fn bounded<T, F>(&self, step: &str, fut: F) -> Result<T, ImportError>
    where
        F: std::future::Future<Output = Result<T, ImportError>>,
    {
        with_timeout(step, self.settings.call_timeout, fut).await
    }
}

impl<S: VoucherService + 'static> fmt::Debug for VoucherImporter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoucherImporter")
            .field("service", &self.service)
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .field("used", &self.is_used())
            .field("profile", &self.profile.get())
            .finish()
    }
}

async fn check_local_file(path: &Path, import_root: Option<&Path>) -> Result<(), ImportError> {
    if path.as_os_str().is_empty() {
        return Err(ImportError::validation("No file provided; missing parameter 'filePath'"));
    }

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| ImportError::validation(format!("File does not exist: {}", path.display())))?;

    if !metadata.is_file() {
        return Err(ImportError::validation(format!(
            "Path exists but is not a file: {}",
            path.display()
        )));
    }

    if let Some(root) = import_root {
        check_inside_root(path, root).await?;
    }

    Ok(())
}

/// 规范化后 (解析 `..` 和符号链接) 必须位于导入目录之下
async fn check_inside_root(path: &Path, root: &Path) -> Result<(), ImportError> {
    let root = tokio::fs::canonicalize(root).await.map_err(|e| {
        ImportError::validation(format!("Import directory unavailable: {}: {}", root.display(), e))
    })?;
    let resolved = tokio::fs::canonicalize(path)
        .await
        .map_err(|_| ImportError::validation(format!("File does not exist: {}", path.display())))?;

    if !resolved.starts_with(&root) {
        tracing::warn!("Rejected {}: outside import directory {}", path.display(), root.display());
        return Err(ImportError::validation(format!(
            "File is outside the import directory: {}",
            path.display()
        )));
    }

    Ok(())
}

/// `objects` 为数组时取第一个元素
fn parse_profile(response: &Value) -> Result<ClientProfile, ImportError> {
    let payload = match wire::objects(response) {
        Some(Value::Array(items)) => items.first(),
        Some(obj @ Value::Object(_)) => Some(obj),
        _ => None,
    }
    .ok_or_else(|| ImportError::malformed(UpstreamFailure::ProfileLoadFailed, "client profile", response))?;

    serde_json::from_value(payload.clone()).map_err(|e| {
        ImportError::upstream(UpstreamFailure::ProfileLoadFailed, format!("invalid client profile: {}", e))
    })
}
