//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态。存储句柄在进程边界显式构造后
//! 注入各服务，handler 之间不共享任何进程内可变状态。

use std::sync::Arc;

use liuren_shared::config::AppConfig;

use crate::ledger::LedgerStore;
use crate::paypal::PayPalClient;
use crate::service::{AdjustmentService, ConsumptionService, IssuanceService, RedemptionService};

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// 账本存储（管理端列表直接读取）
    pub ledger: Arc<dyn LedgerStore>,
    pub issuance: Arc<IssuanceService>,
    pub redemption: Arc<RedemptionService>,
    pub consumption: Arc<ConsumptionService>,
    pub adjustment: Arc<AdjustmentService>,
    /// 未配置凭证时为 None，支付相关接口返回错误
    pub paypal: Option<Arc<PayPalClient>>,
}

impl AppState {
    /// 创建新的应用状态，基于同一个账本存储构造全部服务
    pub fn new(
        config: Arc<AppConfig>,
        ledger: Arc<dyn LedgerStore>,
        paypal: Option<Arc<PayPalClient>>,
    ) -> Self {
        Self {
            config,
            issuance: Arc::new(IssuanceService::new(ledger.clone())),
            redemption: Arc::new(RedemptionService::new(ledger.clone())),
            consumption: Arc::new(ConsumptionService::new(ledger.clone())),
            adjustment: Arc::new(AdjustmentService::new(ledger.clone())),
            ledger,
            paypal,
        }
    }
}
