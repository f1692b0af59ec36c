//! HTTP 层集成测试
//!
//! 用内存账本存储组装完整路由，通过 tower 的 oneshot 验证
//! 请求校验、错误映射与响应包络。

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use tower::ServiceExt;

use access_code_service::ledger::{LedgerStore, MemoryLedgerStore};
use access_code_service::routes;
use access_code_service::state::AppState;
use liuren_shared::config::AppConfig;

/// 默认管理密码（AdminConfig::default 的值）
const ADMIN_SECRET: &str = "liuren-admin-secret-change-in-production";

fn test_app() -> (Router, Arc<MemoryLedgerStore>) {
    let store = Arc::new(MemoryLedgerStore::new());
    let ledger: Arc<dyn LedgerStore> = store.clone();
    let state = AppState::new(Arc::new(AppConfig::default()), ledger, None);
    let app = Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state);
    (app, store)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// 管理端创建起卦码，返回初始密码，再经查询与扣减走通全流程
#[tokio::test]
async fn admin_issue_then_check_then_consume() {
    let (app, _store) = test_app();

    // 1. 管理端创建
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/codes",
            serde_json::json!({
                "password": ADMIN_SECRET,
                "quota": 2,
                "contact": "13812345678"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let code = body["data"]["code"].as_str().unwrap().to_string();
    let password = body["data"]["initialPassword"].as_str().unwrap().to_string();
    assert_eq!(password, "345678");
    // 响应中的联系方式已脱敏
    assert_eq!(body["data"]["contact"], "138****5678");

    // 2. 查询余额
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/quota/check",
            serde_json::json!({"code": code, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["remaining"], 2);
    assert_eq!(body["data"]["used"], 0);

    // 3. 扣减两次后第三次报配额用完
    for expected_remaining in [1, 0] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/quota/consume",
                serde_json::json!({"code": code, "password": password}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["remaining"], expected_remaining);
    }

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/quota/consume",
            serde_json::json!({"code": code, "password": password}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "QUOTA_EXHAUSTED");
    assert_eq!(body["success"], false);
}

/// 管理密码错误返回 403 FORBIDDEN
#[tokio::test]
async fn admin_endpoints_reject_wrong_secret() {
    let (app, _store) = test_app();

    for (uri, body) in [
        (
            "/api/admin/codes",
            serde_json::json!({"password": "wrong", "quota": 1}),
        ),
        (
            "/api/admin/codes/list",
            serde_json::json!({"password": "wrong"}),
        ),
        (
            "/api/admin/codes/add-quota",
            serde_json::json!({"password": "wrong", "code": "LR-AAAA-BBBB", "additionalUses": 1}),
        ),
    ] {
        let response = app.clone().oneshot(post_json(uri, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri={uri}");
        let body = body_json(response).await;
        assert_eq!(body["code"], "FORBIDDEN");
    }
}

/// 不存在的起卦码返回 404，包络携带错误码
#[tokio::test]
async fn check_missing_code_returns_not_found() {
    let (app, _store) = test_app();

    let response = app
        .oneshot(post_json(
            "/api/quota/check",
            serde_json::json!({"code": "LR-ZZZZ-ZZZZ", "password": "345678"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "CODE_NOT_FOUND");
}

/// 请求体校验失败返回 400
#[tokio::test]
async fn validation_errors_return_bad_request() {
    let (app, _store) = test_app();

    // 密码不是 6 位数字
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/quota/check",
            serde_json::json!({"code": "LR-AAAA-BBBB", "password": "abc"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_INPUT");

    // 起卦码格式非法（通过 DTO 校验后在 normalize 处拒绝）
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/quota/check",
            serde_json::json!({"code": "not-a-code", "password": "345678"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// 管理端列表返回脱敏后的全部起卦码
#[tokio::test]
async fn admin_list_returns_masked_codes() {
    let (app, _store) = test_app();

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/admin/codes",
                serde_json::json!({
                    "password": ADMIN_SECRET,
                    "quota": 1,
                    "contact": "13812345678"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(post_json(
            "/api/admin/codes/list",
            serde_json::json!({"password": ADMIN_SECRET}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 3);
    let codes = body["data"]["codes"].as_array().unwrap();
    assert_eq!(codes.len(), 3);
    for entry in codes {
        assert_eq!(entry["contact"], "138****5678");
        // 明文密码与哈希都不出现在列表里
        assert!(entry.get("passwordHash").is_none());
        assert!(entry.get("initialPassword").is_none());
    }
}

/// 未配置 PayPal 时支付接口返回 500 而不是 panic
#[tokio::test]
async fn paypal_endpoints_unavailable_without_credentials() {
    let (app, _store) = test_app();

    let response = app
        .oneshot(post_json("/api/paypal/orders", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
