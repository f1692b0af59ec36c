//! 响应 DTO 定义
//!
//! 所有 REST API 的响应体结构。联系方式一律以脱敏形式返回。

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ledger::AccessCodeRecord;
use crate::service::issuance::IssuedCode;
use crate::service::{QuotaStatus, adjustment::AdjustOutcome, consumption::ConsumeOutcome};
use liuren_shared::crypto;

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// 创建成功响应（无数据）
    pub fn success_empty() -> ApiResponse<()> {
        ApiResponse {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: None,
        }
    }
}

/// 余额快照 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatusDto {
    pub code: String,
    pub remaining: u32,
    pub total: u32,
    pub used: u32,
    /// 已脱敏的联系方式
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<QuotaStatus> for QuotaStatusDto {
    fn from(status: QuotaStatus) -> Self {
        Self {
            code: status.code,
            remaining: status.remaining,
            total: status.total,
            used: status.used,
            contact: status.owner_contact,
            created_at: status.created_at,
            expires_at: status.expires_at,
        }
    }
}

/// 扣减结果 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeResultDto {
    pub remaining: u32,
    pub used: u32,
    pub total: u32,
}

impl From<ConsumeOutcome> for ConsumeResultDto {
    fn from(outcome: ConsumeOutcome) -> Self {
        Self {
            remaining: outcome.remaining,
            used: outcome.used,
            total: outcome.total,
        }
    }
}

/// 签发结果 DTO
///
/// `initial_password` 只在签发响应中出现一次，之后不可恢复。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCodeDto {
    pub code: String,
    pub total: u32,
    pub remaining: u32,
    pub initial_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<IssuedCode> for IssuedCodeDto {
    fn from(issued: IssuedCode) -> Self {
        Self {
            code: issued.code,
            total: issued.total,
            remaining: issued.total,
            initial_password: issued.initial_password,
            contact: issued.owner_contact.as_deref().map(crypto::mask_contact),
            expires_at: issued.expires_at,
        }
    }
}

/// 配额调整结果 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustResultDto {
    pub code: String,
    pub new_total: u32,
    pub remaining: u32,
}

impl From<AdjustOutcome> for AdjustResultDto {
    fn from(outcome: AdjustOutcome) -> Self {
        Self {
            code: outcome.code,
            new_total: outcome.new_total,
            remaining: outcome.remaining,
        }
    }
}

/// 管理端列表中的单条起卦码摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSummaryDto {
    pub code: String,
    pub total: u32,
    pub used: u32,
    pub remaining: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<&AccessCodeRecord> for CodeSummaryDto {
    fn from(record: &AccessCodeRecord) -> Self {
        Self {
            code: record.code.clone(),
            total: record.total_uses,
            used: record.used_count,
            remaining: record.remaining(),
            contact: record.owner_contact.as_deref().map(crypto::mask_contact),
            created_at: record.created_at,
            expires_at: record.expires_at,
            last_used_at: record.last_used_at,
        }
    }
}

/// 管理端起卦码列表 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeListDto {
    pub total: usize,
    pub codes: Vec<CodeSummaryDto>,
}

/// 支付订单创建结果 DTO
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedDto {
    pub order_id: String,
    pub status: String,
}
