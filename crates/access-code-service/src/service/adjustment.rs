//! 管理端配额调整服务
//!
//! 只允许增加 totalUses（充值），从不减少。与扣减不在同一方向上竞争，
//! 但仍走 CAS 循环写入，避免与并发扣减互相覆盖。

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::code;
use crate::error::{QuotaError, Result};
use crate::ledger::{CasOutcome, LedgerAction, LedgerStore, UsageLogEntry};
use crate::service::MAX_CAS_ATTEMPTS;

/// 调整结果
#[derive(Debug, Clone)]
pub struct AdjustOutcome {
    pub code: String,
    pub new_total: u32,
    pub remaining: u32,
}

/// 配额调整服务
pub struct AdjustmentService {
    store: Arc<dyn LedgerStore>,
}

impl AdjustmentService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// 为起卦码增加配额
    ///
    /// 管理权限校验由调用方（管理端 handler）完成。
    #[instrument(skip(self))]
    pub async fn add_quota(&self, code_input: &str, additional_uses: u32) -> Result<AdjustOutcome> {
        if additional_uses == 0 {
            return Err(QuotaError::Validation("增加的次数必须大于 0".to_string()));
        }

        let code = code::normalize(code_input)?;

        for _attempt in 0..MAX_CAS_ATTEMPTS {
            let record = self
                .store
                .get(&code)
                .await?
                .ok_or_else(|| QuotaError::CodeNotFound(code.clone()))?;

            let mut updated = record.clone();
            updated.total_uses = record.total_uses.saturating_add(additional_uses);

            match self
                .store
                .compare_and_swap(record.used_count, &updated)
                .await?
            {
                CasOutcome::Swapped => {
                    info!(
                        code = %code,
                        additional = additional_uses,
                        new_total = updated.total_uses,
                        "配额增加成功"
                    );

                    let entry = UsageLogEntry::new(&updated, LedgerAction::QuotaAdded);
                    if let Err(e) = self.store.append_log(&entry).await {
                        warn!(code = %code, error = %e, "调整日志写入失败");
                    }

                    return Ok(AdjustOutcome {
                        code,
                        new_total: updated.total_uses,
                        remaining: updated.remaining(),
                    });
                }
                CasOutcome::Conflict => continue,
                CasOutcome::Missing => return Err(QuotaError::CodeNotFound(code)),
            }
        }

        Err(QuotaError::Contention(code))
    }
}
