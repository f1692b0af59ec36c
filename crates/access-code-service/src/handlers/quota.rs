//! 用户侧配额 API 处理器
//!
//! 查询、扣减与改密三个操作的 HTTP 接口。

use axum::{Json, extract::State};
use validator::Validate;

use crate::dto::{
    ApiResponse, CheckQuotaRequest, ConsumeQuotaRequest, ConsumeResultDto, QuotaStatusDto,
    UpdatePasswordRequest,
};
use crate::error::QuotaError;
use crate::state::AppState;

/// 查询配额（只读，不消耗次数）
///
/// POST /api/quota/check
pub async fn check_quota(
    State(state): State<AppState>,
    Json(req): Json<CheckQuotaRequest>,
) -> Result<Json<ApiResponse<QuotaStatusDto>>, QuotaError> {
    req.validate()?;

    let status = state.redemption.check(&req.code, &req.password).await?;
    Ok(Json(ApiResponse::success(QuotaStatusDto::from(status))))
}

/// 扣减一次配额
///
/// POST /api/quota/consume
pub async fn consume_quota(
    State(state): State<AppState>,
    Json(req): Json<ConsumeQuotaRequest>,
) -> Result<Json<ApiResponse<ConsumeResultDto>>, QuotaError> {
    req.validate()?;

    let outcome = state.consumption.consume(&req.code, &req.password).await?;
    Ok(Json(ApiResponse::success(ConsumeResultDto::from(outcome))))
}

/// 修改密码（需旧密码重新鉴权）
///
/// POST /api/quota/password
pub async fn update_password(
    State(state): State<AppState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, QuotaError> {
    req.validate()?;

    state
        .redemption
        .change_password(&req.code, &req.old_password, &req.new_password)
        .await?;

    Ok(Json(ApiResponse::success_with_message((), "密码修改成功")))
}
