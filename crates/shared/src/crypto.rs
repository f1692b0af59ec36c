//! 凭证哈希与数据脱敏
//!
//! 起卦码密码使用加盐 SHA-256 存储：`v1$<hex 盐>$<hex 摘要>`。
//! 密码空间本身较小（手机号后 6 位派生），加盐防止同密码记录互相比对，
//! 摘要比较一律使用常量时间比较。

use rand::Rng;
use sha2::{Digest, Sha256};

/// 哈希格式版本标记，为将来更换算法预留升级路径
const HASH_VERSION: &str = "v1";

/// 盐长度（字节）
const SALT_LEN: usize = 16;

/// 对密码进行加盐哈希
///
/// 每次调用生成独立的随机盐，相同密码产生不同的存储值。
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_LEN] = rand::rng().random();
    let digest = salted_digest(&salt, password);
    format!("{HASH_VERSION}${}${}", hex_encode(&salt), hex_encode(&digest))
}

/// 验证密码与存储的哈希值是否匹配
///
/// 格式不合法的存储值一律判为不匹配，不报错——存储值损坏等同于凭证失效。
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(version), Some(salt_hex), Some(digest_hex), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if version != HASH_VERSION {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex_decode(salt_hex), hex_decode(digest_hex)) else {
        return false;
    };

    let actual = salted_digest(&salt, password);
    constant_time_eq::constant_time_eq(&actual, &expected)
}

/// 常量时间比较两个共享密钥（如管理密码）
pub fn verify_shared_secret(provided: &str, expected: &str) -> bool {
    constant_time_eq::constant_time_eq(provided.as_bytes(), expected.as_bytes())
}

/// 计算 SHA-256(盐 || 密码)
fn salted_digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(hex: &str) -> Result<Vec<u8>, ()> {
    if hex.len() % 2 != 0 {
        return Err(());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

// ============================================================
// 脱敏辅助函数
// ============================================================

/// 手机号脱敏：保留前 3 位和后 4 位
///
/// 示例: `13812345678` -> `138****5678`
/// 不足 7 位的短号码全部遮蔽，防止反推原始号码。
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 7 {
        return "****".to_string();
    }
    let prefix: String = digits[..3].iter().collect();
    let suffix: String = digits[digits.len() - 4..].iter().collect();
    format!("{prefix}****{suffix}")
}

/// 邮箱脱敏：保留首字符和 @ 后域名
///
/// 示例: `kevin@example.com` -> `k***@example.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            if local.is_empty() {
                return format!("***@{domain}");
            }
            let first_char: String = local.chars().next().unwrap().to_string();
            format!("{first_char}***@{domain}")
        }
        // 格式不合法时全部遮蔽
        None => "***".to_string(),
    }
}

/// 联系方式脱敏：按内容自动选择手机号或邮箱脱敏规则
pub fn mask_contact(contact: &str) -> String {
    if contact.contains('@') {
        mask_email(contact)
    } else {
        mask_phone(contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hashed = hash_password("345678");
        assert!(verify_password("345678", &hashed));
        assert!(!verify_password("345679", &hashed));
    }

    /// 随机盐保证相同密码产生不同存储值
    #[test]
    fn same_password_different_hashes() {
        let h1 = hash_password("123456");
        let h2 = hash_password("123456");
        assert_ne!(h1, h2);
        assert!(verify_password("123456", &h1));
        assert!(verify_password("123456", &h2));
    }

    #[test]
    fn hash_format_structure() {
        let hashed = hash_password("123456");
        let parts: Vec<&str> = hashed.split('$').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "v1");
        assert_eq!(parts[1].len(), SALT_LEN * 2);
        assert_eq!(parts[2].len(), 64); // SHA-256 摘要的 hex 长度
    }

    /// 损坏或非法格式的存储值判为不匹配而不是 panic
    #[test]
    fn malformed_stored_hash_rejected() {
        assert!(!verify_password("123456", ""));
        assert!(!verify_password("123456", "v1$zz$zz"));
        assert!(!verify_password("123456", "v2$00$00"));
        assert!(!verify_password("123456", "plain-sha256-hex"));
        assert!(!verify_password("123456", "v1$00$00$00"));
    }

    #[test]
    fn shared_secret_comparison() {
        assert!(verify_shared_secret("admin-secret", "admin-secret"));
        assert!(!verify_shared_secret("admin-secret", "admin-secret2"));
        assert!(!verify_shared_secret("", "admin-secret"));
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("13812345678"), "138****5678");
        // 带国际区号时，过滤非数字后脱敏
        assert_eq!(mask_phone("+8613812345678"), "861****5678");
        assert_eq!(mask_phone("123"), "****"); // 太短，全部遮蔽
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("kevin@example.com"), "k***@example.com");
        assert_eq!(mask_email("@domain.com"), "***@domain.com");
        assert_eq!(mask_email("no-at-sign"), "***");
    }

    #[test]
    fn test_mask_contact_dispatch() {
        assert_eq!(mask_contact("13812345678"), "138****5678");
        assert_eq!(mask_contact("kevin@example.com"), "k***@example.com");
    }
}
