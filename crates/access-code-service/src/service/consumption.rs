//! 配额扣减服务 —— 并发正确性的核心
//!
//! 扣减必须在并发调用下防止超发：两个请求同时读到 remaining=1、
//! 各自通过校验、各自写回 usedCount+1，就会把 1 次配额用成 2 次。
//! 这里用乐观并发协议消除该竞态：读取快照 -> 在快照上校验前置条件
//! -> 以观察到的 usedCount 为版本号做条件写入 -> 冲突则重读重试。
//! 冲突重试有硬上限，超限报告 Contention 而不是静默多扣。

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use liuren_shared::crypto;

use crate::code;
use crate::error::{QuotaError, Result};
use crate::ledger::{CasOutcome, LedgerAction, LedgerStore, UsageLogEntry};
use crate::service::MAX_CAS_ATTEMPTS;

/// 扣减结果
#[derive(Debug, Clone)]
pub struct ConsumeOutcome {
    pub remaining: u32,
    pub used: u32,
    pub total: u32,
}

/// 配额扣减服务
pub struct ConsumptionService {
    store: Arc<dyn LedgerStore>,
}

impl ConsumptionService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// 原子扣减一次配额
    ///
    /// 密码在每次尝试中都基于最新快照校验，改密与扣减并发时
    /// 不会放行旧密码。
    #[instrument(skip(self, password))]
    pub async fn consume(&self, code_input: &str, password: &str) -> Result<ConsumeOutcome> {
        let code = code::normalize(code_input)?;

        for attempt in 0..MAX_CAS_ATTEMPTS {
            // 1. 读取当前记录快照
            let record = self
                .store
                .get(&code)
                .await?
                .ok_or_else(|| QuotaError::CodeNotFound(code.clone()))?;

            // 2. 在快照上校验全部前置条件
            if !crypto::verify_password(password, &record.password_hash) {
                warn!(code = %code, "密码验证失败");
                return Err(QuotaError::Unauthorized);
            }

            let now = Utc::now();
            if record.is_expired(now) {
                return Err(QuotaError::Expired(code));
            }

            if record.used_count >= record.total_uses {
                return Err(QuotaError::QuotaExhausted(code));
            }

            // 3. 以观察到的 usedCount 为版本号做条件写入
            let mut updated = record.clone();
            updated.used_count = record.used_count + 1;
            updated.last_used_at = Some(now);

            match self
                .store
                .compare_and_swap(record.used_count, &updated)
                .await?
            {
                CasOutcome::Swapped => {
                    info!(
                        code = %code,
                        used = updated.used_count,
                        remaining = updated.remaining(),
                        "配额扣减成功"
                    );

                    // 5. 审计日志尽力而为，失败不回滚扣减
                    let entry = UsageLogEntry::new(&updated, LedgerAction::Consumed);
                    if let Err(e) = self.store.append_log(&entry).await {
                        warn!(code = %code, error = %e, "使用日志写入失败");
                    }

                    return Ok(ConsumeOutcome {
                        remaining: updated.remaining(),
                        used: updated.used_count,
                        total: updated.total_uses,
                    });
                }
                // 4. 另一并发扣减抢先完成，重读最新状态再试
                CasOutcome::Conflict => {
                    debug!(code = %code, attempt, "扣减冲突，重读重试");
                    continue;
                }
                CasOutcome::Missing => return Err(QuotaError::CodeNotFound(code)),
            }
        }

        warn!(code = %code, attempts = MAX_CAS_ATTEMPTS, "扣减重试次数用尽");
        Err(QuotaError::Contention(code))
    }
}
