//! Redis 账本存储实现
//!
//! 两个原子原语的落地：
//! - 签发：SET NX [EX]，存在性检查与创建在同一条命令内完成；
//! - 扣减：Lua 脚本在服务端解码记录、比对 usedCount 后 KEEPTTL 覆写，
//!   读-改-写之间不存在竞态窗口。

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use liuren_shared::retry::{RetryPolicy, retry_with_policy};
use liuren_shared::store::Store;

use crate::error::{QuotaError, Result};
use crate::ledger::record::{AccessCodeRecord, UsageLogEntry};
use crate::ledger::store::{CasOutcome, LedgerStore, log_key, quota_key};

/// 乐观并发写入脚本
///
/// KEYS[1] = quota:<CODE>
/// ARGV[1] = 期望的 usedCount（版本号）
/// ARGV[2] = 新记录的 JSON
///
/// 返回 1 = 写入成功，0 = 版本冲突，-1 = 记录不存在。
/// KEEPTTL 保留既有过期时间，覆写不会让记录"续命"。
const CAS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return -1
end
local record = cjson.decode(current)
if tonumber(record.usedCount) ~= tonumber(ARGV[1]) then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
return 1
"#;

/// Redis 账本存储
#[derive(Clone)]
pub struct RedisLedgerStore {
    store: Store,
    /// 使用日志的保留期
    log_ttl: Duration,
    /// 只读路径的瞬时故障重试策略
    read_retry: RetryPolicy,
}

impl RedisLedgerStore {
    pub fn new(store: Store, log_ttl: Duration) -> Self {
        Self {
            store,
            log_ttl,
            read_retry: RetryPolicy::fast(),
        }
    }
}

#[async_trait]
impl LedgerStore for RedisLedgerStore {
    /// 读取配额记录
    ///
    /// 只读操作没有副作用，瞬时存储故障自动重试。
    async fn get(&self, code: &str) -> Result<Option<AccessCodeRecord>> {
        let key = quota_key(code);
        let record = retry_with_policy(
            &self.read_retry,
            "ledger_get",
            liuren_shared::error::StoreError::is_retryable,
            || self.store.get::<AccessCodeRecord>(&key),
        )
        .await?;
        Ok(record)
    }

    #[instrument(skip(self, record), fields(code = %record.code))]
    async fn insert_if_absent(&self, record: &AccessCodeRecord) -> Result<bool> {
        let key = quota_key(&record.code);
        let ttl = record.ttl_from(Utc::now());
        let created = self.store.set_nx(&key, record, ttl).await?;
        Ok(created)
    }

    #[instrument(skip(self, record), fields(code = %record.code, expected = expected_used_count))]
    async fn compare_and_swap(
        &self,
        expected_used_count: u32,
        record: &AccessCodeRecord,
    ) -> Result<CasOutcome> {
        let key = quota_key(&record.code);
        let serialized = serde_json::to_string(record)
            .map_err(|e| QuotaError::Internal(format!("记录序列化失败: {e}")))?;

        let mut conn = self.store.connection().await.map_err(QuotaError::from)?;
        let result: i64 = redis::Script::new(CAS_SCRIPT)
            .key(&key)
            .arg(expected_used_count)
            .arg(serialized)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| QuotaError::StoreUnavailable(e.to_string()))?;

        match result {
            1 => Ok(CasOutcome::Swapped),
            0 => {
                debug!(code = %record.code, "CAS 版本冲突");
                Ok(CasOutcome::Conflict)
            }
            _ => Ok(CasOutcome::Missing),
        }
    }

    async fn append_log(&self, entry: &UsageLogEntry) -> Result<()> {
        let key = log_key(&entry.code, entry.timestamp);
        self.store.set_ex(&key, entry, self.log_ttl).await?;
        Ok(())
    }

    /// 列出所有在存记录
    ///
    /// 单条记录读取失败只跳过并告警，不让整个列表失败。
    async fn list(&self) -> Result<Vec<AccessCodeRecord>> {
        let keys = self.store.keys("quota:LR-*").await?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            match self.store.get::<AccessCodeRecord>(&key).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {} // 列举与读取之间被 TTL 清理
                Err(e) => warn!(key = %key, error = %e, "读取配额记录失败，已跳过"),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liuren_shared::config::RedisConfig;

    fn test_store() -> RedisLedgerStore {
        let store = Store::new(&RedisConfig::default()).expect("创建 Redis 客户端失败");
        RedisLedgerStore::new(store, Duration::from_secs(3600))
    }

    fn test_record(code: &str, total: u32, used: u32) -> AccessCodeRecord {
        AccessCodeRecord {
            code: code.to_string(),
            password_hash: liuren_shared::crypto::hash_password("345678"),
            total_uses: total,
            used_count: used,
            created_at: Utc::now(),
            expires_at: Some(Utc::now() + chrono::Duration::minutes(10)),
            last_used_at: None,
            owner_contact: None,
            paypal_order_id: None,
        }
    }

    #[tokio::test]
    #[ignore] // Requires Redis running at localhost:6379
    async fn test_insert_get_roundtrip() {
        let ledger = test_store();
        let record = test_record("LR-TEST-RT01", 5, 0);

        let created = ledger.insert_if_absent(&record).await.unwrap();
        assert!(created);

        // 二次创建同码应失败
        let created_again = ledger.insert_if_absent(&record).await.unwrap();
        assert!(!created_again);

        let loaded = ledger.get(&record.code).await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_cas_conflict_and_missing() {
        let ledger = test_store();
        let record = test_record("LR-TEST-CAS1", 3, 0);
        ledger.insert_if_absent(&record).await.unwrap();

        let mut updated = record.clone();
        updated.used_count = 1;

        // 期望版本正确 -> 成功
        let outcome = ledger.compare_and_swap(0, &updated).await.unwrap();
        assert_eq!(outcome, CasOutcome::Swapped);

        // 期望版本已落后 -> 冲突
        let mut stale = record.clone();
        stale.used_count = 1;
        let outcome = ledger.compare_and_swap(0, &stale).await.unwrap();
        assert_eq!(outcome, CasOutcome::Conflict);

        // 不存在的记录 -> Missing
        let ghost = test_record("LR-TEST-NONE", 3, 0);
        let outcome = ledger.compare_and_swap(0, &ghost).await.unwrap();
        assert_eq!(outcome, CasOutcome::Missing);
    }

    /// 核心并发性质：10 个并发 CAS 扣减对 3 次配额恰好成功 3 次
    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_concurrent_cas_no_double_spend() {
        let ledger = test_store();
        let record = test_record("LR-TEST-CON1", 3, 0);
        ledger.insert_if_absent(&record).await.unwrap();

        let mut handles = vec![];
        for _ in 0..10 {
            let ledger = ledger.clone();
            let code = record.code.clone();
            handles.push(tokio::spawn(async move {
                // 单轮读-判-CAS，不重试：统计纯粹的原子性
                let current = ledger.get(&code).await.unwrap().unwrap();
                if current.used_count >= current.total_uses {
                    return false;
                }
                let mut updated = current.clone();
                updated.used_count += 1;
                matches!(
                    ledger
                        .compare_and_swap(current.used_count, &updated)
                        .await
                        .unwrap(),
                    CasOutcome::Swapped
                )
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        let final_record = ledger.get(&record.code).await.unwrap().unwrap();
        assert!(successes <= 3, "成功次数不能超过配额: {successes}");
        assert_eq!(
            final_record.used_count, successes,
            "最终 usedCount 必须等于成功的扣减次数"
        );
    }
}
