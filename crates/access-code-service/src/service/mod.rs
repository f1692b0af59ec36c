//! 业务服务层
//!
//! 四个服务围绕同一个账本存储协作：签发创建记录，查询只读校验，
//! 扣减执行原子递减，调整执行管理端增额。
//! 所有带写入的操作共用同一个乐观并发重试上限。

pub mod adjustment;
pub mod consumption;
pub mod issuance;
pub mod redemption;

pub use adjustment::AdjustmentService;
pub use consumption::ConsumptionService;
pub use issuance::{IssuanceService, IssueRequest, IssuedCode};
pub use redemption::{QuotaStatus, RedemptionService};

/// 乐观并发写入的最大尝试次数
///
/// 超过后向调用方报告 Contention，而不是无界自旋。
pub(crate) const MAX_CAS_ATTEMPTS: u32 = 5;
