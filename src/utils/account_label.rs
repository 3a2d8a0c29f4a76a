//! 托管后端账户标签派生
//!
//! 标签从用户稳定元数据（手机号标识）确定性派生，转账路径每次
//! 重新计算而不是冗余存储。修改本函数的映射规则会让同一用户映射
//! 到新的后端账户，属于需要数据迁移的破坏性变更。

/// 从稳定标识派生后端安全的账户标签
///
/// 规则（黑盒保留，调用方必须精确一致）：
/// 1. 全部转小写；
/// 2. 非字母数字字节映射为 `-`，连续的 `-` 折叠为一个；
/// 3. 去除首尾 `-`；
/// 4. 加 `u-` 前缀；
/// 5. 截断到 36 字符（不足 2 字符的输入经前缀后自然满足下限）。
pub fn derive(stable_identifier: &str) -> String {
    let mut normalized = String::with_capacity(stable_identifier.len());
    let mut last_was_hyphen = false;

    for ch in stable_identifier.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            normalized.push(ch);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            normalized.push('-');
            last_was_hyphen = true;
        }
    }

    let trimmed = normalized.trim_matches('-');
    let mut label = format!("u-{}", trimmed);
    label.truncate(36);
    // 截断可能留下尾部连字符
    while label.ends_with('-') {
        label.pop();
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(derive("+86 138 0013 8000"), derive("+86 138 0013 8000"));
    }

    #[test]
    fn test_phone_sanitization() {
        assert_eq!(derive("+86 138 0013 8000"), "u-86-138-0013-8000");
        assert_eq!(derive("(555) 010-9999"), "u-555-010-9999");
    }

    #[test]
    fn test_case_folding_and_run_collapse() {
        assert_eq!(derive("User..Name__42"), "u-user-name-42");
    }

    #[test]
    fn test_length_bounds() {
        let long = "9".repeat(100);
        let label = derive(&long);
        assert_eq!(label.len(), 36);
        assert!(label.starts_with("u-"));

        let short = derive("7");
        assert_eq!(short, "u-7");
        assert!(short.len() >= 2);
    }

    #[test]
    fn test_label_charset() {
        let label = derive("  weird☃input++here  ");
        assert!(label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert!(!label.ends_with('-'));
    }
}
