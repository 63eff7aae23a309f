pub mod address;
pub mod directory;
pub mod estimator;
pub mod importer;
pub mod normalizer;
pub mod resolver;

pub use address::AddressCache;
pub use directory::{ContactDirectory, DirectorySnapshot};
pub use estimator::ClassificationEstimator;
pub use importer::VoucherImporter;
pub use normalizer::normalize_extractions;
pub use resolver::{normalize_iban, resolve_issuer, IssuerResolver};

use crate::cache::DEFAULT_TTL;
use crate::upstream::DEFAULT_CALL_TIMEOUT;
use std::path::PathBuf;
use std::time::Duration;

/// 联系人分页大小
pub const DEFAULT_PAGE_SIZE: usize = 100;
/// 单次目录加载最多请求的页数
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// 导入流程参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub page_size: usize,
    /// 达到上限仍未取完视为上游异常
    pub max_pages: usize,
    pub cache_ttl: Duration,
    /// 单次上游调用超时
    pub call_timeout: Duration,
    /// 设置后只允许导入该目录下的文件
    pub import_root: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            cache_ttl: DEFAULT_TTL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            import_root: None,
        }
    }
}
