pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod upstream;

pub use cache::{CacheSource, MemoryCache, SharedCache};
pub use config::AppConfig;
pub use error::{ImportError, UpstreamFailure};
pub use service::{ImportSettings, VoucherImporter};
pub use upstream::{ApiToken, SevdeskClient};
