//! 配额查询与密码管理服务
//!
//! `check` 是只读操作：校验起卦码与密码后返回余额快照，从不改动
//! usedCount。`change_password` 是唯一允许变更密码摘要的入口，
//! 必须用旧密码重新鉴权。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use liuren_shared::crypto;

use crate::code;
use crate::error::{QuotaError, Result};
use crate::ledger::{CasOutcome, LedgerAction, LedgerStore, UsageLogEntry};
use crate::service::MAX_CAS_ATTEMPTS;

/// 余额快照
#[derive(Debug, Clone)]
pub struct QuotaStatus {
    pub code: String,
    pub remaining: u32,
    pub total: u32,
    pub used: u32,
    /// 已脱敏的联系方式
    pub owner_contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 配额查询服务
pub struct RedemptionService {
    store: Arc<dyn LedgerStore>,
}

impl RedemptionService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// 校验起卦码与密码并返回余额，不消耗配额
    ///
    /// 结果顺序：不存在 -> 密码错误 -> 已过期。过期与不存在是两种
    /// 用户可见的不同结果，不能混为一谈。
    #[instrument(skip(self, password))]
    pub async fn check(&self, code_input: &str, password: &str) -> Result<QuotaStatus> {
        let code = code::normalize(code_input)?;

        let record = self
            .store
            .get(&code)
            .await?
            .ok_or_else(|| QuotaError::CodeNotFound(code.clone()))?;

        if !crypto::verify_password(password, &record.password_hash) {
            warn!(code = %code, "密码验证失败");
            return Err(QuotaError::Unauthorized);
        }

        if record.is_expired(Utc::now()) {
            return Err(QuotaError::Expired(code));
        }

        info!(code = %code, remaining = record.remaining(), total = record.total_uses, "配额查询成功");

        Ok(QuotaStatus {
            code,
            remaining: record.remaining(),
            total: record.total_uses,
            used: record.used_count,
            owner_contact: record.owner_contact.as_deref().map(crypto::mask_contact),
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    /// 修改密码（需旧密码重新鉴权）
    ///
    /// 通过 CAS 循环写入：并发扣减改变 usedCount 时重读重试，
    /// 保证改密不会覆盖掉并发完成的扣减。
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        code_input: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let code = code::normalize(code_input)?;

        for _attempt in 0..MAX_CAS_ATTEMPTS {
            let record = self
                .store
                .get(&code)
                .await?
                .ok_or_else(|| QuotaError::CodeNotFound(code.clone()))?;

            if !crypto::verify_password(old_password, &record.password_hash) {
                warn!(code = %code, "旧密码验证失败");
                return Err(QuotaError::Unauthorized);
            }

            let mut updated = record.clone();
            updated.password_hash = crypto::hash_password(new_password);

            match self
                .store
                .compare_and_swap(record.used_count, &updated)
                .await?
            {
                CasOutcome::Swapped => {
                    info!(code = %code, "密码修改成功");
                    let entry = UsageLogEntry::new(&updated, LedgerAction::PasswordChanged);
                    if let Err(e) = self.store.append_log(&entry).await {
                        warn!(code = %code, error = %e, "改密日志写入失败");
                    }
                    return Ok(());
                }
                CasOutcome::Conflict => continue,
                CasOutcome::Missing => return Err(QuotaError::CodeNotFound(code)),
            }
        }

        Err(QuotaError::Contention(code))
    }
}
