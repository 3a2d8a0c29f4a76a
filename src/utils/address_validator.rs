//! 地址验证模块
//!
//! 统一的收款地址校验入口：EVM 十六进制（含 EIP-55 校验和）与
//! Solana Base58。校验在任何网络调用之前完成。

use crate::domain::chain::ChainFamily;

/// 地址验证器
pub struct AddressValidator;

impl AddressValidator {
    /// 按链家族验证地址格式
    pub fn validate(family: &ChainFamily, address: &str) -> bool {
        match family {
            ChainFamily::Evm { .. } => Self::validate_evm_address(address),
            ChainFamily::Solana { .. } => Self::validate_solana_address(address),
        }
    }

    /// 验证 EVM 地址（支持 EIP-55 Checksum）
    fn validate_evm_address(address: &str) -> bool {
        if !address.starts_with("0x") || address.len() != 42 {
            return false;
        }

        let hex_part = &address[2..];
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }

        // 混合大小写按 EIP-55 校验；全小写/全大写视为无校验和地址
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower {
            return Self::verify_eip55_checksum(address);
        }

        true
    }

    /// EIP-55 Checksum 验证
    /// https://eips.ethereum.org/EIPS/eip-55
    fn verify_eip55_checksum(address: &str) -> bool {
        use sha3::{Digest, Keccak256};

        let addr_lower = address[2..].to_lowercase();
        let mut hasher = Keccak256::new();
        hasher.update(addr_lower.as_bytes());
        let hash = hasher.finalize();

        for (i, ch) in address[2..].chars().enumerate() {
            if ch.is_alphabetic() {
                let hash_byte = hash[i / 2];
                let hash_nibble = if i % 2 == 0 {
                    hash_byte >> 4
                } else {
                    hash_byte & 0x0f
                };
                if ch.is_uppercase() != (hash_nibble >= 8) {
                    return false;
                }
            }
        }

        true
    }

    /// 验证 Solana 地址（Base58 编码的 32 字节公钥）
    fn validate_solana_address(address: &str) -> bool {
        if address.len() < 32 || address.len() > 44 {
            return false;
        }

        match bs58::decode(address).into_vec() {
            Ok(decoded) => decoded.len() == 32,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVM: ChainFamily = ChainFamily::Evm { chain_id: 1 };
    const SOL: ChainFamily = ChainFamily::Solana {
        cluster: "mainnet-beta",
    };

    #[test]
    fn test_evm_address_basic_format() {
        assert!(AddressValidator::validate(
            &EVM,
            "0x52908400098527886e0f7030069857d2e4169ee7"
        ));
        // 缺前缀 / 长度不对 / 非法字符
        assert!(!AddressValidator::validate(
            &EVM,
            "52908400098527886e0f7030069857d2e4169ee7"
        ));
        assert!(!AddressValidator::validate(&EVM, "0x1234"));
        assert!(!AddressValidator::validate(
            &EVM,
            "0xZZ908400098527886e0f7030069857d2e4169ee7"
        ));
    }

    #[test]
    fn test_eip55_checksum_vectors() {
        // EIP-55 官方测试向量
        assert!(AddressValidator::validate(
            &EVM,
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        ));
        assert!(AddressValidator::validate(
            &EVM,
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        ));
        // 篡改一个大小写即失败
        assert!(!AddressValidator::validate(
            &EVM,
            "0x5aaeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        ));
    }

    #[test]
    fn test_solana_address() {
        assert!(AddressValidator::validate(
            &SOL,
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
        ));
        assert!(!AddressValidator::validate(&SOL, "not-base58-0OIl"));
        assert!(!AddressValidator::validate(&SOL, "abc"));
        // EVM 地址不是合法的 Solana 地址
        assert!(!AddressValidator::validate(
            &SOL,
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        ));
    }
}
