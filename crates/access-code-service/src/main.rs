//! 起卦码配额服务
//!
//! 签发、查询与原子扣减预付起卦码的 REST API。

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::Request,
    http::HeaderValue,
    middleware,
    middleware::Next,
    response::Response,
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use access_code_service::{
    ledger::{LedgerStore, RedisLedgerStore},
    paypal::PayPalClient,
    routes,
    state::AppState,
};
use liuren_shared::{
    config::{AdminConfig, AppConfig},
    observability,
    observability::middleware as obs_middleware,
    store::Store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：config/default.toml + config/{env}.toml + LIUREN_ 环境变量
    let mut config = AppConfig::load("access-code-service").unwrap_or_default();

    observability::init(&config.service_name, &config.observability)?;
    info!("Starting access-code-service on {}", config.server_addr());

    // 密钥只从环境变量注入，不落配置文件
    if let Ok(secret) = std::env::var("LIUREN_ADMIN_SECRET") {
        config.admin.secret = secret;
    }
    if let Ok(client_id) = std::env::var("LIUREN_PAYPAL_CLIENT_ID") {
        config.paypal.client_id = client_id;
    }
    if let Ok(secret) = std::env::var("LIUREN_PAYPAL_SECRET") {
        config.paypal.secret = secret;
    }

    // 生产环境必须更换默认管理密码，否则任何人都能签发起卦码
    if config.is_production() && config.admin.secret == AdminConfig::default().secret {
        anyhow::bail!("LIUREN_ADMIN_SECRET must be set in production environment");
    }

    // 初始化基础设施
    let store = Store::new(&config.redis)?;
    let ledger: Arc<dyn LedgerStore> = Arc::new(RedisLedgerStore::new(
        store.clone(),
        Duration::from_secs(config.quota.log_retention_days * 24 * 60 * 60),
    ));

    let paypal = if config.paypal.is_configured() {
        let client = PayPalClient::new(config.paypal.clone())
            .map_err(|e| anyhow::anyhow!("初始化 PayPal 客户端失败: {e}"))?;
        info!(mode = %config.paypal.mode, "PayPal client initialized");
        Some(Arc::new(client))
    } else {
        warn!("未配置 PayPal 凭证，支付相关接口不可用");
        None
    };

    let state = AppState::new(Arc::new(config.clone()), ledger, paypal);

    // CORS 配置：通过 LIUREN_CORS_ORIGINS 环境变量控制允许的来源
    let allowed_origins = std::env::var("LIUREN_CORS_ORIGINS").unwrap_or_else(|_| {
        "https://victorlau.myqnapcloud.com,https://liuren-payment-victor.vercel.app".to_string()
    });

    let cors = if allowed_origins == "*" {
        // 生产环境使用通配符 CORS 是严重的安全隐患
        if config.is_production() {
            warn!("LIUREN_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .nest("/api", routes::api_routes())
        .route("/health", get(health_check))
        .route(
            "/ready",
            get({
                let store_for_ready = store;
                move || readiness_check(store_for_ready.clone())
            }),
        )
        // HTTP 安全头：纵深防御，即使反向代理未配置也确保基本安全策略生效
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        // 可观测性中间件：请求追踪和请求 ID 关联
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM 或 Ctrl+C 时停止接收新连接，
    // 等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    // 禁止浏览器猜测 Content-Type
    headers.insert("x-content-type-options", "nosniff".parse().unwrap());
    // 禁止页面被嵌入 iframe，防止点击劫持
    headers.insert("x-frame-options", "DENY".parse().unwrap());
    // 强制浏览器后续访问只使用 HTTPS
    headers.insert(
        "strict-transport-security",
        "max-age=31536000; includeSubDomains".parse().unwrap(),
    );
    response
}

/// 监听关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 存活探针：服务进程正常即返回 ok
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "access-code-service"
    }))
}

/// 就绪探针：检查 Redis 连接是否可用
async fn readiness_check(store: Store) -> Json<serde_json::Value> {
    let redis_ok = store.health_check().await.is_ok();

    Json(serde_json::json!({
        "status": if redis_ok { "ok" } else { "degraded" },
        "service": "access-code-service",
        "checks": {
            "redis": if redis_ok { "ok" } else { "fail" }
        }
    }))
}
