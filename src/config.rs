use crate::service::ImportSettings;
use crate::upstream::client::DEFAULT_BASE_URL;
use crate::upstream::ApiToken;
use config::{Config, ConfigError, Environment, File, Source};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 应用配置
///
/// 优先级: 环境变量 (`VOUCHER_IMPORT_*`, 嵌套用 `__`) > `voucher-import.toml` > 默认值。
/// `SEVDESK_TOKEN` 可直接提供令牌。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HTTP 接口只接受该目录下的文件
    pub import_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_token: ApiToken,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub page_size: usize,
    pub max_pages: usize,
}

impl AppConfig {
    /// 从默认值、配置文件和环境变量加载配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(
            File::with_name("voucher-import").required(false),
            Self::environment(),
            std::env::var("SEVDESK_TOKEN").ok(),
        )
    }

    fn environment() -> Environment {
        Environment::with_prefix("VOUCHER_IMPORT")
            .prefix_separator("_")
            .separator("__")
    }

    fn from_sources<F>(file: F, environment: Environment, token: Option<String>) -> Result<Self, ConfigError>
    where
        F: Source + Send + Sync + 'static,
    {
        Self::builder()?
            .add_source(file)
            .add_source(environment)
            .set_override_option("upstream.api_token", token)?
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.import_root", "inbox")?
            .set_default("upstream.base_url", DEFAULT_BASE_URL)?
            .set_default("upstream.request_timeout_secs", 30)?
            .set_default("cache.ttl_secs", 15 * 60)?
            .set_default("cache.page_size", 100)?
            .set_default("cache.max_pages", 1000)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.request_timeout_secs)
    }

    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            page_size: self.cache.page_size,
            max_pages: self.cache.max_pages,
            cache_ttl: Duration::from_secs(self.cache.ttl_secs),
            call_timeout: self.request_timeout(),
            import_root: Some(self.server.import_root.clone()),
        }
    }
}
