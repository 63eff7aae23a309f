use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use voucher_import_rust::api::{self, AppState};
use voucher_import_rust::{AppConfig, SevdeskClient, SharedCache};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置 (令牌在 Debug 输出中已脱敏)
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 上游客户端
    let client = SevdeskClient::new(
        config.upstream.base_url.clone(),
        config.upstream.api_token.clone(),
        config.request_timeout(),
    )?;
    info!("Upstream client created for {}", client.base_url());

    let import_root = &config.server.import_root;
    if tokio::fs::metadata(import_root).await.map(|m| m.is_dir()).unwrap_or(false) {
        info!("Import directory: {}", import_root.display());
    } else {
        warn!("⚠️ Import directory {} does not exist; imports will be rejected", import_root.display());
    }

    // 进程级缓存, 由所有导入请求共享
    let state = AppState {
        service: Arc::new(client),
        cache: Arc::new(SharedCache::in_memory()),
        settings: config.import_settings(),
    };

    let app = api::router(state).layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /health");
    info!("  POST /api/vouchers/import");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
