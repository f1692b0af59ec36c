//! 请求 DTO 定义
//!
//! 字段级规则在这里挡掉明显非法的输入；起卦码的规范化与严格格式
//! 校验在核心的 `code::normalize` 中完成。

use serde::Deserialize;
use validator::{Validate, ValidationError};

/// 校验密码格式：至少 6 位纯数字
///
/// 初始密码派生自联系方式尾部数字，改密后的密码沿用同一格式约束。
fn validate_numeric_password(value: &str) -> Result<(), ValidationError> {
    if value.len() >= 6 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("numeric_password");
        err.message = Some("密码必须至少6位数字".into());
        Err(err)
    }
}

/// 校验联系方式：至少 8 位纯数字的手机号
fn validate_contact(value: &str) -> Result<(), ValidationError> {
    if value.len() >= 8 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("contact");
        err.message = Some("请输入至少8位数字的有效手机号码".into());
        Err(err)
    }
}

/// 查询配额请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckQuotaRequest {
    #[validate(length(min = 1, max = 32, message = "起卦码不能为空"))]
    pub code: String,
    #[validate(custom(function = validate_numeric_password))]
    pub password: String,
}

/// 扣减配额请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeQuotaRequest {
    #[validate(length(min = 1, max = 32, message = "起卦码不能为空"))]
    pub code: String,
    #[validate(custom(function = validate_numeric_password))]
    pub password: String,
}

/// 修改密码请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, max = 32, message = "起卦码不能为空"))]
    pub code: String,
    #[validate(length(min = 1, message = "请提供旧密码"))]
    pub old_password: String,
    #[validate(custom(function = validate_numeric_password))]
    pub new_password: String,
}

/// 管理端创建起卦码请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCodeRequest {
    /// 管理密码
    #[validate(length(min = 1, message = "请提供管理密码"))]
    pub password: String,
    #[validate(range(min = 1, max = 1000, message = "配额必须在1-1000之间"))]
    pub quota: u32,
    /// 持有人联系方式，用于派生初始密码
    #[validate(custom(function = validate_contact))]
    pub contact: Option<String>,
    /// 有效期（天）；缺省使用配置的默认有效期
    #[validate(range(min = 1, max = 3650, message = "有效期必须在1-3650天之间"))]
    pub expires_in_days: Option<i64>,
}

/// 管理端列出起卦码请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListCodesRequest {
    /// 管理密码
    #[validate(length(min = 1, message = "请提供管理密码"))]
    pub password: String,
}

/// 管理端增加配额请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddQuotaRequest {
    /// 管理密码
    #[validate(length(min = 1, message = "请提供管理密码"))]
    pub password: String,
    #[validate(length(min = 1, max = 32, message = "起卦码不能为空"))]
    pub code: String,
    #[validate(range(min = 1, max = 1000, message = "增加的次数必须在1-1000之间"))]
    pub additional_uses: u32,
}

/// 创建支付订单请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// 订单金额；缺省使用配置的默认金额（5 次方案）
    #[validate(range(min = 0.01, message = "金额必须大于 0"))]
    pub amount: Option<f64>,
}

/// 捕获支付订单请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOrderRequest {
    /// 付款人联系方式，用于派生初始密码
    #[validate(custom(function = validate_contact))]
    pub contact: String,
}
