//! PayPal 支付网关客户端
//!
//! 固定的协作方契约：client_credentials 换取访问令牌，创建订单，
//! 捕获订单。只有捕获状态为 COMPLETED 的订单才会进入签发流程，
//! 其余状态由调用方映射为 PaymentNotCompleted。

use std::time::Duration;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use liuren_shared::config::PayPalConfig;

use crate::error::{QuotaError, Result};

/// PayPal 捕获成功时返回的状态值
pub const CAPTURE_STATUS_COMPLETED: &str = "COMPLETED";

/// PayPal REST 客户端
pub struct PayPalClient {
    http: reqwest::Client,
    config: PayPalConfig,
}

/// 创建订单的结果
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    pub id: String,
    pub status: String,
}

/// 捕获订单的结果
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub order_id: String,
    pub status: String,
    /// 实际支付金额，用于映射配额档位
    pub amount: f64,
}

// ---- PayPal 响应报文（只解出需要的字段）----

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    #[serde(default)]
    amount: Option<Amount>,
    #[serde(default)]
    payments: Option<Payments>,
}

#[derive(Debug, Deserialize)]
struct Payments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    #[serde(default)]
    amount: Option<Amount>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    value: String,
}

impl PayPalClient {
    pub fn new(config: PayPalConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| QuotaError::Internal(format!("构建 HTTP 客户端失败: {e}")))?;
        Ok(Self { http, config })
    }

    /// 以 client_credentials 方式获取访问令牌
    async fn access_token(&self) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.api_base()))
            .basic_auth(&self.config.client_id, Some(&self.config.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(QuotaError::ExternalService {
                service: "paypal".to_string(),
                message: format!("获取访问令牌失败: HTTP {}", response.status()),
            });
        }

        let token: TokenResponse = response.json().await.map_err(map_reqwest_error)?;
        Ok(token.access_token)
    }

    /// 创建支付订单
    #[instrument(skip(self))]
    pub async fn create_order(&self, amount: f64, description: &str) -> Result<CreatedOrder> {
        let token = self.access_token().await?;

        let body = serde_json::json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": self.config.currency,
                    "value": format!("{amount:.2}"),
                },
                "description": description,
            }]
        });

        let response = self
            .http
            .post(format!("{}/v2/checkout/orders", self.config.api_base()))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "PayPal 订单创建失败");
            return Err(QuotaError::ExternalService {
                service: "paypal".to_string(),
                message: format!("订单创建失败: HTTP {}", response.status()),
            });
        }

        let order: CreatedOrder = response.json().await.map_err(map_reqwest_error)?;
        info!(order_id = %order.id, amount, "PayPal 订单创建成功");
        Ok(order)
    }

    /// 捕获支付订单
    ///
    /// 返回捕获状态与实际金额；状态是否为 COMPLETED 由调用方判定。
    #[instrument(skip(self))]
    pub async fn capture_order(&self, order_id: &str) -> Result<CaptureOutcome> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{order_id}/capture",
                self.config.api_base()
            ))
            .bearer_auth(&token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            warn!(order_id, status = %response.status(), "PayPal 订单捕获失败");
            return Err(QuotaError::ExternalService {
                service: "paypal".to_string(),
                message: format!("订单捕获失败: HTTP {}", response.status()),
            });
        }

        let capture: CaptureResponse = response.json().await.map_err(map_reqwest_error)?;
        let amount = extract_amount(&capture).ok_or_else(|| QuotaError::ExternalService {
            service: "paypal".to_string(),
            message: "捕获响应中缺少金额".to_string(),
        })?;

        info!(order_id = %capture.id, status = %capture.status, amount, "PayPal 订单捕获完成");

        Ok(CaptureOutcome {
            order_id: capture.id,
            status: capture.status,
            amount,
        })
    }
}

/// 从捕获响应中提取支付金额
///
/// 优先取 payments.captures 里的实际捕获金额，缺失时回退到
/// purchase_unit 的订单金额。
fn extract_amount(capture: &CaptureResponse) -> Option<f64> {
    let unit = capture.purchase_units.first()?;

    let amount = unit
        .payments
        .as_ref()
        .and_then(|p| p.captures.first())
        .and_then(|c| c.amount.as_ref())
        .or(unit.amount.as_ref())?;

    amount.value.parse::<f64>().ok()
}

fn map_reqwest_error(err: reqwest::Error) -> QuotaError {
    if err.is_timeout() {
        QuotaError::ExternalServiceTimeout {
            service: "paypal".to_string(),
        }
    } else {
        QuotaError::ExternalService {
            service: "paypal".to_string(),
            message: err.to_string(),
        }
    }
}
