//! 起卦码生成与规范化
//!
//! 起卦码格式: `LR-XXXX-XXXX`，符号取自去除易混淆字符（0/O、1/I）的字母表。
//! 本模块只负责概率性生成与格式校验；唯一性由签发服务通过存储的
//! SET NX 原语保证。

use rand::Rng;

use crate::error::{QuotaError, Result};

/// 起卦码前缀
pub const CODE_PREFIX: &str = "LR-";

/// 符号字母表（32 个符号，排除 0/O/1/I 等易混淆字符）
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 每段符号数
const GROUP_LEN: usize = 4;

/// 规范化后起卦码的总长度: "LR-" + 4 + "-" + 4
const CODE_LEN: usize = 12;

/// 生成一个随机起卦码
///
/// 每个符号位从字母表中均匀抽取，无副作用，可重复调用。
pub fn generate() -> String {
    let mut rng = rand::rng();
    let mut code = String::with_capacity(CODE_LEN);
    code.push_str(CODE_PREFIX);
    for _ in 0..GROUP_LEN {
        code.push(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char);
    }
    code.push('-');
    for _ in 0..GROUP_LEN {
        code.push(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char);
    }
    code
}

/// 规范化用户输入的起卦码
///
/// 输入大小写不敏感，存储与查询一律使用大写规范形式。
pub fn normalize(input: &str) -> Result<String> {
    let code = input.trim().to_ascii_uppercase();
    if !is_valid_format(&code) {
        return Err(QuotaError::Validation(
            "起卦码格式错误，应为 LR-XXXX-XXXX".to_string(),
        ));
    }
    Ok(code)
}

/// 校验规范形式的起卦码格式: LR-[A-Z0-9]{4}-[A-Z0-9]{4}
///
/// 查询侧接受全量大写字母数字，比生成字母表宽松——输入错一个易混淆
/// 字符时应得到"不存在"而不是"格式错误"。
pub fn is_valid_format(code: &str) -> bool {
    let bytes = code.as_bytes();
    if bytes.len() != CODE_LEN || !code.starts_with(CODE_PREFIX) || bytes[7] != b'-' {
        return false;
    }
    bytes[3..7]
        .iter()
        .chain(&bytes[8..12])
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
