//! 原始金额处理
//!
//! 金额在本层内一律是最小单位的十进制整数字符串。这里提供解析与
//! 展示换算（仅费用预估的展示字符串用到），全部走整数/字符串运算，
//! 不经过浮点。

use anyhow::{anyhow, Result};

/// 解析最小单位整数字符串（拒绝空串、符号、小数点与非数字）
///
/// 上界为 u128：约 3.4e38，远超现实转账金额；超界输入报错而不是
/// 静默截断。
pub fn parse_raw_amount(raw: &str) -> Result<u128> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(anyhow!("raw amount must be a decimal integer string: {:?}", raw));
    }
    raw.parse::<u128>()
        .map_err(|_| anyhow!("raw amount out of range: {}", raw))
}

/// 最小单位 -> 人类可读单位字符串（去除尾部多余的零，至多保留 6 位小数）
pub fn format_units(raw: u128, decimals: u8) -> String {
    let scale = 10u128.pow(decimals as u32);
    let integer = raw / scale;
    let fraction = raw % scale;

    if fraction == 0 {
        return integer.to_string();
    }

    let mut frac_str = format!("{:0width$}", fraction, width = decimals as usize);
    if frac_str.len() > 6 {
        frac_str.truncate(6);
    }
    while frac_str.ends_with('0') {
        frac_str.pop();
    }

    if frac_str.is_empty() {
        // 截断后只剩零：展示为略小于一个可见单位
        return format!("{}.000001", integer);
    }
    format!("{}.{}", integer, frac_str)
}

/// 解析 JSON-RPC 的 0x 十六进制数量字段
pub fn parse_hex_quantity(hex_str: &str) -> Result<u128> {
    let trimmed = hex_str.trim_start_matches("0x");
    if trimmed.is_empty() {
        return Err(anyhow!("empty hex quantity"));
    }
    u128::from_str_radix(trimmed, 16)
        .map_err(|e| anyhow!("invalid hex quantity {}: {}", hex_str, e))
}

/// 缩短的 mint 标识，用于未知代币的占位符号（ABCD..WXYZ）
///
/// 输入来自 provider JSON，不保证是合法 base58，按字符切片而不是
/// 字节切片。
pub fn short_identifier(id: &str) -> String {
    let count = id.chars().count();
    if count <= 10 {
        return id.to_string();
    }
    let head: String = id.chars().take(4).collect();
    let tail: String = id.chars().skip(count - 4).collect();
    format!("{}..{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_amount() {
        assert_eq!(parse_raw_amount("0").unwrap(), 0);
        assert_eq!(parse_raw_amount("1000000").unwrap(), 1_000_000);
        assert!(parse_raw_amount("").is_err());
        assert!(parse_raw_amount("-5").is_err());
        assert!(parse_raw_amount("1.5").is_err());
        assert!(parse_raw_amount("1e9").is_err());
        assert!(parse_raw_amount(" 42").is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(0, 18), "0");
        assert_eq!(format_units(1_000_000_000_000_000_000, 18), "1");
        assert_eq!(format_units(100_000_000_000_000, 18), "0.0001");
        assert_eq!(format_units(5_000, 9), "0.000005");
        assert_eq!(format_units(2_500_000, 6), "2.5");
        // 低于展示精度时不落到 0
        assert_eq!(format_units(1, 18), "0.000001");
    }

    #[test]
    fn test_parse_hex_quantity() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_hex_quantity("0x1a2b3c").unwrap(), 1_715_004);
        assert!(parse_hex_quantity("0x").is_err());
        assert!(parse_hex_quantity("0xzz").is_err());
        // 超出 u128 上界报错而不是截断
        assert!(parse_hex_quantity(&format!("0x{}", "f".repeat(33))).is_err());
    }

    #[test]
    fn test_short_identifier() {
        assert_eq!(
            short_identifier("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
            "EPjF..Dt1v"
        );
        assert_eq!(short_identifier("short"), "short");
    }

    #[test]
    fn test_short_identifier_multibyte_input() {
        // provider 可能返回任意字符串，多字节字符不得 panic
        let weird = "铸币标识符超过十个字符的情形测试";
        let short = short_identifier(weird);
        assert!(short.contains(".."));
        assert_eq!(short.chars().count(), 10);

        assert_eq!(short_identifier("短标识"), "短标识");
    }
}
