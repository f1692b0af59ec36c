//! 内存账本存储
//!
//! 基于 DashMap 实现，单个 key 的 entry 操作持有分片写锁，
//! 因此 `insert_if_absent` 与 `compare_and_swap` 天然原子，
//! 与 Redis 实现的并发语义一致。用于测试和本地开发。

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Mutex;

use crate::error::Result;
use crate::ledger::record::{AccessCodeRecord, UsageLogEntry};
use crate::ledger::store::{CasOutcome, LedgerStore};

/// 内存账本存储
#[derive(Default)]
pub struct MemoryLedgerStore {
    records: DashMap<String, AccessCodeRecord>,
    logs: Mutex<Vec<UsageLogEntry>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取已追加的日志（测试断言用）
    pub fn logged_entries(&self) -> Vec<UsageLogEntry> {
        self.logs.lock().expect("日志锁中毒").clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get(&self, code: &str) -> Result<Option<AccessCodeRecord>> {
        Ok(self.records.get(code).map(|entry| entry.value().clone()))
    }

    async fn insert_if_absent(&self, record: &AccessCodeRecord) -> Result<bool> {
        match self.records.entry(record.code.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn compare_and_swap(
        &self,
        expected_used_count: u32,
        record: &AccessCodeRecord,
    ) -> Result<CasOutcome> {
        match self.records.get_mut(&record.code) {
            None => Ok(CasOutcome::Missing),
            Some(mut entry) => {
                if entry.used_count != expected_used_count {
                    return Ok(CasOutcome::Conflict);
                }
                *entry = record.clone();
                Ok(CasOutcome::Swapped)
            }
        }
    }

    async fn append_log(&self, entry: &UsageLogEntry) -> Result<()> {
        self.logs.lock().expect("日志锁中毒").push(entry.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AccessCodeRecord>> {
        let mut records: Vec<AccessCodeRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_record(code: &str, total: u32, used: u32) -> AccessCodeRecord {
        AccessCodeRecord {
            code: code.to_string(),
            password_hash: "v1$00$00".to_string(),
            total_uses: total,
            used_count: used,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
            owner_contact: None,
            paypal_order_id: None,
        }
    }

    #[tokio::test]
    async fn insert_if_absent_is_first_writer_wins() {
        let store = MemoryLedgerStore::new();
        let record = test_record("LR-AAAA-AAAA", 5, 0);

        assert!(store.insert_if_absent(&record).await.unwrap());
        assert!(!store.insert_if_absent(&record).await.unwrap());

        let loaded = store.get("LR-AAAA-AAAA").await.unwrap().unwrap();
        assert_eq!(loaded.total_uses, 5);
    }

    #[tokio::test]
    async fn cas_matches_redis_semantics() {
        let store = MemoryLedgerStore::new();
        let record = test_record("LR-BBBB-BBBB", 3, 0);
        store.insert_if_absent(&record).await.unwrap();

        let mut updated = record.clone();
        updated.used_count = 1;
        assert_eq!(
            store.compare_and_swap(0, &updated).await.unwrap(),
            CasOutcome::Swapped
        );

        // 过期版本号 -> 冲突
        assert_eq!(
            store.compare_and_swap(0, &updated).await.unwrap(),
            CasOutcome::Conflict
        );

        // 不存在的记录 -> Missing
        let ghost = test_record("LR-CCCC-CCCC", 3, 0);
        assert_eq!(
            store.compare_and_swap(0, &ghost).await.unwrap(),
            CasOutcome::Missing
        );
    }

    #[tokio::test]
    async fn list_sorted_by_created_at_desc() {
        let store = MemoryLedgerStore::new();
        let mut older = test_record("LR-DDDD-DDDD", 1, 0);
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        let newer = test_record("LR-EEEE-EEEE", 1, 0);

        store.insert_if_absent(&older).await.unwrap();
        store.insert_if_absent(&newer).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].code, "LR-EEEE-EEEE");
        assert_eq!(listed[1].code, "LR-DDDD-DDDD");
    }
}
