//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub connect_timeout_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout_seconds: 5,
        }
    }
}

/// PayPal 支付网关配置
///
/// client_id / secret 由服务启动时从环境变量注入（LIUREN_PAYPAL_CLIENT_ID /
/// LIUREN_PAYPAL_SECRET），配置文件中留空表示支付功能不可用。
#[derive(Debug, Clone, Deserialize)]
pub struct PayPalConfig {
    pub client_id: String,
    pub secret: String,
    /// "sandbox" 或 "live"
    pub mode: String,
    pub currency: String,
    pub request_timeout_seconds: u64,
    /// 未显式指定金额时创建订单使用的默认金额（5 次方案的价格）
    pub default_order_amount: f64,
}

impl Default for PayPalConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            secret: String::new(),
            mode: "sandbox".to_string(),
            currency: "HKD".to_string(),
            request_timeout_seconds: 15,
            default_order_amount: 1000.0,
        }
    }
}

impl PayPalConfig {
    /// PayPal REST API 基础地址
    pub fn api_base(&self) -> &'static str {
        if self.mode == "live" {
            "https://api-m.paypal.com"
        } else {
            "https://api-m.sandbox.paypal.com"
        }
    }

    /// 是否配置了可用的凭证
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.secret.is_empty()
    }
}

/// 配额档位：付款金额到起卦次数的映射
///
/// `max_amount` 为 None 的档位是兜底档，匹配任意金额。
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaTier {
    #[serde(default)]
    pub max_amount: Option<f64>,
    pub uses: u32,
}

/// 配额策略配置
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// 起卦码默认有效期（天）；None 表示签发永久有效的起卦码
    #[serde(default = "default_expiry_days")]
    pub default_expiry_days: Option<i64>,
    /// 使用日志保留天数
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,
    /// 金额 -> 次数映射表，按顺序匹配第一个覆盖该金额的档位
    #[serde(default = "default_tiers")]
    pub tiers: Vec<QuotaTier>,
}

fn default_expiry_days() -> Option<i64> {
    Some(90)
}

fn default_log_retention_days() -> u64 {
    90
}

fn default_tiers() -> Vec<QuotaTier> {
    vec![
        QuotaTier {
            max_amount: Some(50.0),
            uses: 1,
        },
        QuotaTier {
            max_amount: None,
            uses: 5,
        },
    ]
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            default_expiry_days: default_expiry_days(),
            log_retention_days: default_log_retention_days(),
            tiers: default_tiers(),
        }
    }
}

impl QuotaConfig {
    /// 根据付款金额查找对应的配额次数
    ///
    /// 返回 None 表示金额未被任何档位覆盖（配置表缺少兜底档）。
    pub fn uses_for_amount(&self, amount: f64) -> Option<u32> {
        for tier in &self.tiers {
            match tier.max_amount {
                Some(max) if amount <= max => return Some(tier.uses),
                Some(_) => continue,
                None => return Some(tier.uses),
            }
        }
        None
    }
}

/// 管理端配置
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// 管理操作共享密钥，生产环境必须通过 LIUREN_ADMIN_SECRET 覆盖
    pub secret: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            secret: "liuren-admin-secret-change-in-production".to_string(),
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub paypal: PayPalConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. 环境变量（LIUREN_ 前缀，如 LIUREN_REDIS_URL -> redis.url）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("LIUREN_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                Environment::with_prefix("LIUREN")
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
