use bank_recon_rust::db::run_migrations;
use bank_recon_rust::service::normalize::decimal_from_f64;
use bank_recon_rust::service::MatchOptions;
use bank_recon_rust::{api, create_pool, AppConfig, PgLedgerStore, ReconcileService};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let config = AppConfig::from_env()?;

    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    run_migrations(&pool).await?;
    info!("Migrations applied");

    let amount_tolerance = decimal_from_f64(config.matching.amount_tolerance)
        .ok_or("matching.amount_tolerance must be a finite number")?;
    let defaults = MatchOptions {
        tolerance_days: config.matching.tolerance_days,
        amount_tolerance,
    };

    let store = Arc::new(PgLedgerStore::new(
        pool,
        Duration::from_secs(config.database.write_timeout_secs),
    ));
    let service = Arc::new(ReconcileService::new(store, defaults));

    let app = api::router(service).layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST   /api/reconcile/auto             - 自动对账");
    info!("  POST   /api/matches                    - 人工匹配");
    info!("  POST   /api/matches/preview            - 评分预览");
    info!("  DELETE /api/matches/:id                - 撤销匹配");
    info!("  GET    /api/accounts/:id/matches(.csv) - 匹配列表/导出");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
