//! 配额账本数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 配额记录，以起卦码为主键
///
/// 序列化为 camelCase JSON 存入键 `quota:<CODE>`。
/// 不变量（每次操作后必须成立）：
/// - `0 <= used_count <= total_uses`
/// - `expires_at` 一旦过期，任何扣减都不再成功
/// - `password_hash` 只通过重新鉴权的改密操作变更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeRecord {
    /// 起卦码，创建后不可变
    pub code: String,
    /// 密码的加盐摘要，创建后不再以明文出现
    pub password_hash: String,
    /// 累计授予的总次数，只增不减
    pub total_uses: u32,
    /// 已使用次数，只增不减
    pub used_count: u32,
    pub created_at: DateTime<Utc>,
    /// None 表示永久有效
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    /// 持有人联系方式（手机号/邮箱），仅用于派生初始密码和审计关联
    #[serde(default)]
    pub owner_contact: Option<String>,
    /// 付费签发时关联的 PayPal 订单号
    #[serde(default)]
    pub paypal_order_id: Option<String>,
}

impl AccessCodeRecord {
    /// 剩余可用次数
    pub fn remaining(&self) -> u32 {
        self.total_uses.saturating_sub(self.used_count)
    }

    /// 是否已过期
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }

    /// 记录的剩余存活时间，作为存储键的 TTL
    ///
    /// None 表示永久记录（不设 TTL）；已过期的记录返回最小 TTL，
    /// 交由存储尽快清理。
    pub fn ttl_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at.map(|expires_at| {
            let secs = expires_at.signed_duration_since(now).num_seconds().max(1);
            Duration::from_secs(secs as u64)
        })
    }
}

/// 账本事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    Issued,
    Consumed,
    QuotaAdded,
    PasswordChanged,
}

/// 使用日志条目
///
/// 只追加、带 TTL 的审计记录，核心逻辑从不回读。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogEntry {
    pub code: String,
    pub action: LedgerAction,
    pub timestamp: DateTime<Utc>,
    pub remaining_after: u32,
}

impl UsageLogEntry {
    /// 基于操作后的记录快照构造日志条目
    pub fn new(record: &AccessCodeRecord, action: LedgerAction) -> Self {
        Self {
            code: record.code.clone(),
            action,
            timestamp: Utc::now(),
            remaining_after: record.remaining(),
        }
    }
}
