//! 管理端 API 处理器
//!
//! 创建起卦码、查看全部起卦码、增加配额。所有操作先做管理密码校验，
//! 校验使用常量时间比较，失败返回 Forbidden。

use axum::{Json, extract::State};
use chrono::Duration;
use tracing::warn;
use validator::Validate;

use liuren_shared::crypto;

use crate::dto::{
    AddQuotaRequest, AdjustResultDto, ApiResponse, CodeListDto, CodeSummaryDto, CreateCodeRequest,
    IssuedCodeDto, ListCodesRequest,
};
use crate::error::QuotaError;
use crate::service::IssueRequest;
use crate::state::AppState;

/// 管理密码校验
fn require_admin(state: &AppState, provided: &str) -> Result<(), QuotaError> {
    if !crypto::verify_shared_secret(provided, &state.config.admin.secret) {
        warn!("管理密码校验失败");
        return Err(QuotaError::Forbidden);
    }
    Ok(())
}

/// 创建起卦码
///
/// POST /api/admin/codes
pub async fn create_code(
    State(state): State<AppState>,
    Json(req): Json<CreateCodeRequest>,
) -> Result<Json<ApiResponse<IssuedCodeDto>>, QuotaError> {
    req.validate()?;
    require_admin(&state, &req.password)?;

    // 请求未指定有效期时使用配置的默认值；配置也未设置则签发永久码
    let expires_in = req
        .expires_in_days
        .or(state.config.quota.default_expiry_days)
        .map(Duration::days);

    let issued = state
        .issuance
        .issue(IssueRequest {
            quota: req.quota,
            owner_contact: req.contact,
            expires_in,
            paypal_order_id: None,
        })
        .await?;

    let message = format!(
        "起卦码创建成功！初始密码为 {}，请妥善保管，密码仅此一次展示。",
        issued.initial_password
    );
    Ok(Json(ApiResponse::success_with_message(
        IssuedCodeDto::from(issued),
        message,
    )))
}

/// 列出全部起卦码
///
/// POST /api/admin/codes/list
pub async fn list_codes(
    State(state): State<AppState>,
    Json(req): Json<ListCodesRequest>,
) -> Result<Json<ApiResponse<CodeListDto>>, QuotaError> {
    req.validate()?;
    require_admin(&state, &req.password)?;

    let records = state.ledger.list().await?;
    let codes: Vec<CodeSummaryDto> = records.iter().map(CodeSummaryDto::from).collect();

    Ok(Json(ApiResponse::success(CodeListDto {
        total: codes.len(),
        codes,
    })))
}

/// 为起卦码增加配额
///
/// POST /api/admin/codes/add-quota
pub async fn add_quota(
    State(state): State<AppState>,
    Json(req): Json<AddQuotaRequest>,
) -> Result<Json<ApiResponse<AdjustResultDto>>, QuotaError> {
    req.validate()?;
    require_admin(&state, &req.password)?;

    let outcome = state
        .adjustment
        .add_quota(&req.code, req.additional_uses)
        .await?;

    Ok(Json(ApiResponse::success(AdjustResultDto::from(outcome))))
}
