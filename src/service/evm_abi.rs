//! ERC20 调用数据手工编码
//!
//! 只覆盖 balanceOf/transfer 两个选择器，参数均为 32 字节左补零的
//! ABI 静态编码，无需引入完整 ABI 库。

/// balanceOf(address) 选择器
const SELECTOR_BALANCE_OF: &str = "0x70a08231";
/// transfer(address,uint256) 选择器
const SELECTOR_TRANSFER: &str = "0xa9059cbb";

fn pad_address(address: &str) -> String {
    let stripped = address.strip_prefix("0x").unwrap_or(address).to_lowercase();
    format!("{:0>64}", stripped)
}

fn pad_u128(value: u128) -> String {
    format!("{:0>64}", format!("{:x}", value))
}

/// balanceOf(holder) 的 eth_call data 字段
pub fn balance_of_calldata(holder: &str) -> String {
    format!("{}{}", SELECTOR_BALANCE_OF, pad_address(holder))
}

/// transfer(recipient, raw_amount) 的交易 data 字段
pub fn transfer_calldata(recipient: &str, raw_amount: u128) -> String {
    format!(
        "{}{}{}",
        SELECTOR_TRANSFER,
        pad_address(recipient),
        pad_u128(raw_amount)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLDER: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    #[test]
    fn balance_of_calldata_layout() {
        let data = balance_of_calldata(HOLDER);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x70a08231"));
        assert!(data.ends_with("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"));
        // 12 字节前导零
        assert_eq!(&data[10..34], "000000000000000000000000");
    }

    #[test]
    fn transfer_calldata_layout() {
        let data = transfer_calldata(HOLDER, 1_000_000);
        assert_eq!(data.len(), 2 + 8 + 64 + 64);
        assert!(data.starts_with("0xa9059cbb"));
        // 1_000_000 = 0xf4240
        assert!(data.ends_with(
            "00000000000000000000000000000000000000000000000000000000000f4240"
        ));
    }
}
