//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射。

use axum::{Router, routing::post};

use crate::{handlers, state::AppState};

/// 构建 API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // 用户侧配额操作
        .route("/quota/check", post(handlers::quota::check_quota))
        .route("/quota/consume", post(handlers::quota::consume_quota))
        .route("/quota/password", post(handlers::quota::update_password))
        // 管理端操作
        .route("/admin/codes", post(handlers::admin::create_code))
        .route("/admin/codes/list", post(handlers::admin::list_codes))
        .route("/admin/codes/add-quota", post(handlers::admin::add_quota))
        // 支付流程
        .route("/paypal/orders", post(handlers::payment::create_order))
        .route(
            "/paypal/orders/{order_id}/capture",
            post(handlers::payment::capture_order),
        )
}
