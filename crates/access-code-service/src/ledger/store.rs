//! 账本存储抽象
//!
//! 服务层只依赖这组原语；并发正确性完全归约到 `insert_if_absent`
//! 与 `compare_and_swap` 两个原子操作上。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::ledger::record::{AccessCodeRecord, UsageLogEntry};

/// 配额记录的存储键: `quota:<CODE>`
pub fn quota_key(code: &str) -> String {
    format!("quota:{code}")
}

/// 使用日志的存储键: `log:<CODE>:<毫秒时间戳>`
pub fn log_key(code: &str, timestamp: DateTime<Utc>) -> String {
    format!("log:{code}:{}", timestamp.timestamp_millis())
}

/// 条件写入的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// 写入成功，观察到的版本未被他人修改
    Swapped,
    /// 版本冲突：另一并发调用先完成了写入，调用方应重读重试
    Conflict,
    /// 记录不存在（可能已被 TTL 清理）
    Missing,
}

/// 账本存储接口
///
/// `append_log` 的约定是尽力而为：调用方记录失败但从不因此让主操作失败。
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// 读取配额记录
    async fn get(&self, code: &str) -> Result<Option<AccessCodeRecord>>;

    /// 仅当起卦码不存在时创建记录（原子），TTL 取自记录的剩余有效期
    ///
    /// 返回 true 表示创建成功，false 表示起卦码已被占用。
    /// 这是签发路径防碰撞的关键：存在性检查与写入必须是同一个原子操作，
    /// 先查后写会让两个并发签发拿到同一个起卦码。
    async fn insert_if_absent(&self, record: &AccessCodeRecord) -> Result<bool>;

    /// 乐观并发写入：仅当存储中记录的 used_count 等于
    /// `expected_used_count` 时整体替换为 `record`
    ///
    /// used_count 同时充当记录的版本号——任何并发扣减都会改变它，
    /// 使落后的写入者观察到 Conflict。
    async fn compare_and_swap(
        &self,
        expected_used_count: u32,
        record: &AccessCodeRecord,
    ) -> Result<CasOutcome>;

    /// 追加一条使用日志（带保留期 TTL）
    async fn append_log(&self, entry: &UsageLogEntry) -> Result<()>;

    /// 列出所有在存的配额记录（管理端用），按创建时间倒序
    async fn list(&self) -> Result<Vec<AccessCodeRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(quota_key("LR-AB3D-7F2K"), "quota:LR-AB3D-7F2K");

        let ts = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            log_key("LR-AB3D-7F2K", ts),
            format!("log:LR-AB3D-7F2K:{}", ts.timestamp_millis())
        );
    }
}
