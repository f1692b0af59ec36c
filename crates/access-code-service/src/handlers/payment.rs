//! 支付 API 处理器
//!
//! 创建 PayPal 订单与捕获订单。捕获成功（COMPLETED）后按金额映射
//! 配额档位并进入签发流程；其余捕获状态不签发。

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Duration;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::dto::{ApiResponse, CaptureOrderRequest, CreateOrderRequest, IssuedCodeDto, OrderCreatedDto};
use crate::error::QuotaError;
use crate::paypal::{CAPTURE_STATUS_COMPLETED, PayPalClient};
use crate::service::IssueRequest;
use crate::state::AppState;

/// PayPal 订单描述
const ORDER_DESCRIPTION: &str = "大六壬智慧排盘 - 起卦服务";

fn require_paypal(state: &AppState) -> Result<Arc<PayPalClient>, QuotaError> {
    state
        .paypal
        .clone()
        .ok_or_else(|| QuotaError::Internal("PayPal 未配置".to_string()))
}

/// 创建支付订单
///
/// POST /api/paypal/orders
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<OrderCreatedDto>>, QuotaError> {
    req.validate()?;
    let paypal = require_paypal(&state)?;

    let amount = req
        .amount
        .unwrap_or(state.config.paypal.default_order_amount);
    let order = paypal.create_order(amount, ORDER_DESCRIPTION).await?;

    Ok(Json(ApiResponse::success(OrderCreatedDto {
        order_id: order.id,
        status: order.status,
    })))
}

/// 捕获支付订单并签发起卦码
///
/// POST /api/paypal/orders/{order_id}/capture
pub async fn capture_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(req): Json<CaptureOrderRequest>,
) -> Result<Json<ApiResponse<IssuedCodeDto>>, QuotaError> {
    req.validate()?;
    let paypal = require_paypal(&state)?;

    let capture = paypal.capture_order(&order_id).await?;
    if capture.status != CAPTURE_STATUS_COMPLETED {
        return Err(QuotaError::PaymentNotCompleted(capture.status));
    }

    // 金额 -> 配额档位；未覆盖的金额说明档位表配置不完整
    let quota = state
        .config
        .quota
        .uses_for_amount(capture.amount)
        .ok_or_else(|| {
            QuotaError::Internal(format!("金额 {} 未匹配任何配额档位", capture.amount))
        })?;

    info!(
        order_id = %capture.order_id,
        amount = capture.amount,
        quota,
        "付款捕获成功，开始签发起卦码"
    );

    let expires_in = state.config.quota.default_expiry_days.map(Duration::days);
    let issued = state
        .issuance
        .issue(IssueRequest {
            quota,
            owner_contact: Some(req.contact),
            expires_in,
            paypal_order_id: Some(capture.order_id),
        })
        .await?;

    let message = format!(
        "付款成功！您的起卦码已生成，初始密码为手机号码后6位：{}",
        issued.initial_password
    );
    Ok(Json(ApiResponse::success_with_message(
        IssuedCodeDto::from(issued),
        message,
    )))
}
