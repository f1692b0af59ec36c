//! 起卦码签发服务
//!
//! 生成唯一起卦码并创建账本记录。生成器本身只保证概率性唯一，
//! 真正的唯一性由存储的"不存在才创建"原语保证：生成-写入在有界
//! 重试内进行，写入失败（码已被占用）就换一个码重来。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use liuren_shared::crypto;

use crate::code;
use crate::error::{QuotaError, Result};
use crate::ledger::{AccessCodeRecord, LedgerAction, LedgerStore, UsageLogEntry};

/// 签发时生成唯一起卦码的最大尝试次数
const MAX_GENERATION_ATTEMPTS: u32 = 10;

/// 初始密码长度（联系方式尾部数字位数 / 随机密码位数）
const INITIAL_PASSWORD_LEN: usize = 6;

/// 签发请求
#[derive(Debug, Clone)]
pub struct IssueRequest {
    /// 授予的起卦次数，必须大于 0
    pub quota: u32,
    /// 持有人联系方式，用于派生初始密码
    pub owner_contact: Option<String>,
    /// 有效期；None 表示永久有效
    pub expires_in: Option<Duration>,
    /// 付费签发时关联的 PayPal 订单号
    pub paypal_order_id: Option<String>,
}

/// 签发结果
///
/// `initial_password` 是明文初始密码，仅在此处返回一次，
/// 之后不可恢复——调用方必须立即展示或妥善保存。
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: String,
    pub initial_password: String,
    pub total: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub owner_contact: Option<String>,
}

/// 起卦码签发服务
pub struct IssuanceService {
    store: Arc<dyn LedgerStore>,
}

impl IssuanceService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// 签发一个新起卦码
    #[instrument(skip(self, request), fields(quota = request.quota))]
    pub async fn issue(&self, request: IssueRequest) -> Result<IssuedCode> {
        if request.quota == 0 {
            return Err(QuotaError::Validation("配额必须大于 0".to_string()));
        }

        let now = Utc::now();
        let expires_at = request.expires_in.map(|d| now + d);

        let initial_password = derive_initial_password(request.owner_contact.as_deref());
        let password_hash = crypto::hash_password(&initial_password);

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let candidate = code::generate();
            let record = AccessCodeRecord {
                code: candidate.clone(),
                password_hash: password_hash.clone(),
                total_uses: request.quota,
                used_count: 0,
                created_at: now,
                expires_at,
                last_used_at: None,
                owner_contact: request.owner_contact.clone(),
                paypal_order_id: request.paypal_order_id.clone(),
            };

            // 存在性检查与创建是同一条原子命令，两个并发签发
            // 即使生成了相同的候选码也只有一个能写入成功
            if self.store.insert_if_absent(&record).await? {
                info!(
                    code = %candidate,
                    total = request.quota,
                    expires_at = ?expires_at,
                    attempt,
                    "起卦码签发成功"
                );

                let entry = UsageLogEntry::new(&record, LedgerAction::Issued);
                if let Err(e) = self.store.append_log(&entry).await {
                    warn!(code = %candidate, error = %e, "签发日志写入失败");
                }

                return Ok(IssuedCode {
                    code: candidate,
                    initial_password,
                    total: request.quota,
                    expires_at,
                    owner_contact: request.owner_contact,
                });
            }

            debug!(code = %candidate, attempt, "候选起卦码已被占用，重新生成");
        }

        warn!(
            attempts = MAX_GENERATION_ATTEMPTS,
            "无法生成唯一起卦码，放弃签发"
        );
        Err(QuotaError::GenerationExhausted(MAX_GENERATION_ATTEMPTS))
    }
}

/// 派生初始密码
///
/// 规则：联系方式中数字部分的后 6 位；联系方式缺失或数字不足 6 位时
/// 退化为随机 6 位数字密码。
fn derive_initial_password(contact: Option<&str>) -> String {
    if let Some(contact) = contact {
        let digits: Vec<char> = contact.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() >= INITIAL_PASSWORD_LEN {
            return digits[digits.len() - INITIAL_PASSWORD_LEN..].iter().collect();
        }
    }

    let mut rng = rand::rng();
    (0..INITIAL_PASSWORD_LEN)
        .map(|_| char::from_digit(rng.random_range(0..10), 10).unwrap())
        .collect()
}
