//! Solana 交易组装
//!
//! 手工实现 legacy 交易的线格式：账户排序、compact-u16 长度前缀、
//! 指令编码与 PDA（程序派生地址）计算。签名本身由托管后端完成，
//! 本模块只负责产出"缺签名的序列化交易"。

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};

/// 32 字节公钥
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pubkey(pub [u8; 32]);

pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey([0u8; 32]);

/// SPL Token 程序 (TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA)
pub fn token_program_id() -> Pubkey {
    Pubkey::from_base58("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA")
        .expect("static token program id")
}

/// 关联代币账户程序 (ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL)
pub fn associated_token_program_id() -> Pubkey {
    Pubkey::from_base58("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL")
        .expect("static associated token program id")
}

impl Pubkey {
    pub fn from_base58(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .with_context(|| format!("invalid base58 pubkey: {}", s))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow!("pubkey must be 32 bytes: {}", s))?;
        Ok(Pubkey(arr))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// 是否落在 ed25519 曲线上（PDA 必须不在曲线上）
    fn is_on_curve(&self) -> bool {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0).is_ok()
    }
}

impl std::fmt::Display for Pubkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base58())
    }
}

/// PDA 派生：从 255 向下尝试 bump，直到哈希结果不在曲线上
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8)> {
    for bump in (0u8..=255).rev() {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update([bump]);
        hasher.update(program_id.0);
        hasher.update(b"ProgramDerivedAddress");
        let hash: [u8; 32] = hasher.finalize().into();
        let candidate = Pubkey(hash);
        if !candidate.is_on_curve() {
            return Ok((candidate, bump));
        }
    }
    Err(anyhow!("unable to find a viable program address bump"))
}

/// 派生 owner 在某 mint 下的关联代币账户地址
pub fn derive_associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey> {
    let token_program = token_program_id();
    let (address, _bump) = find_program_address(
        &[&owner.0, &token_program.0, &mint.0],
        &associated_token_program_id(),
    )?;
    Ok(address)
}

#[derive(Debug, Clone)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// System Program 原生转账指令（指令索引 2）
pub fn system_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*to, false),
        ],
        data,
    }
}

/// SPL Token Transfer 指令（指令索引 3）
pub fn spl_token_transfer(
    source: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(3u8);
    data.extend_from_slice(&amount.to_le_bytes());
    Instruction {
        program_id: token_program_id(),
        accounts: vec![
            AccountMeta::writable(*source, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*owner, true),
        ],
        data,
    }
}

/// 幂等创建关联代币账户指令（discriminator 1 = CreateIdempotent）
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    associated_account: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: associated_token_program_id(),
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(*associated_account, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::readonly(token_program_id(), false),
        ],
        data: vec![1u8],
    }
}

/// 编译后的 legacy 消息
#[derive(Debug, Clone)]
pub struct Message {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indexes: Vec<u8>,
    pub data: Vec<u8>,
}

impl Message {
    /// 编译指令集为消息：fee payer 固定在账户表首位，其余账户按
    /// (签名者可写, 签名者只读, 非签名者可写, 非签名者只读) 排序
    pub fn compile(
        fee_payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash: [u8; 32],
    ) -> Result<Self> {
        // 合并每个账户的最强权限
        struct Entry {
            pubkey: Pubkey,
            is_signer: bool,
            is_writable: bool,
        }
        let mut entries: Vec<Entry> = vec![Entry {
            pubkey: *fee_payer,
            is_signer: true,
            is_writable: true,
        }];

        let mut upsert = |pubkey: Pubkey, is_signer: bool, is_writable: bool| {
            if let Some(e) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                e.is_signer |= is_signer;
                e.is_writable |= is_writable;
            } else {
                entries.push(Entry {
                    pubkey,
                    is_signer,
                    is_writable,
                });
            }
        };

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            // 程序账户作为只读非签名者参与排序
            upsert(ix.program_id, false, false);
        }

        let fee_payer_key = *fee_payer;
        entries.sort_by_key(|e| {
            let class = match (e.is_signer, e.is_writable) {
                (true, true) => 0u8,
                (true, false) => 1,
                (false, true) => 2,
                (false, false) => 3,
            };
            // fee payer 永远排第一
            (if e.pubkey == fee_payer_key { 0 } else { 1 }, class)
        });

        let num_required_signatures = entries.iter().filter(|e| e.is_signer).count() as u8;
        let num_readonly_signed = entries
            .iter()
            .filter(|e| e.is_signer && !e.is_writable)
            .count() as u8;
        let num_readonly_unsigned = entries
            .iter()
            .filter(|e| !e.is_signer && !e.is_writable)
            .count() as u8;

        let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();
        let index_of = |pubkey: &Pubkey| -> Result<u8> {
            account_keys
                .iter()
                .position(|k| k == pubkey)
                .map(|i| i as u8)
                .ok_or_else(|| anyhow!("account not in table: {}", pubkey))
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let account_indexes = ix
                .accounts
                .iter()
                .map(|m| index_of(&m.pubkey))
                .collect::<Result<Vec<u8>>>()?;
            compiled.push(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indexes,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        out.push(self.num_required_signatures);
        out.push(self.num_readonly_signed);
        out.push(self.num_readonly_unsigned);
        encode_compact_u16(self.account_keys.len() as u16, &mut out);
        for key in &self.account_keys {
            out.extend_from_slice(&key.0);
        }
        out.extend_from_slice(&self.recent_blockhash);
        encode_compact_u16(self.instructions.len() as u16, &mut out);
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_compact_u16(ix.account_indexes.len() as u16, &mut out);
            out.extend_from_slice(&ix.account_indexes);
            encode_compact_u16(ix.data.len() as u16, &mut out);
            out.extend_from_slice(&ix.data);
        }
        out
    }
}

/// 缺签名交易：签名槽位按所需数量占位全零，由托管后端补齐
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub message: Message,
}

impl UnsignedTransaction {
    pub fn new(message: Message) -> Self {
        Self { message }
    }

    /// 序列化为线格式（签名槽位清零，不要求全部签名）
    pub fn serialize(&self) -> Vec<u8> {
        let sig_count = self.message.num_required_signatures as usize;
        let mut out = Vec::with_capacity(1 + sig_count * 64 + 256);
        encode_compact_u16(sig_count as u16, &mut out);
        out.extend(std::iter::repeat(0u8).take(sig_count * 64));
        out.extend_from_slice(&self.message.serialize());
        out
    }

    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(self.serialize())
    }
}

/// Solana shortvec（compact-u16）长度前缀编码
fn encode_compact_u16(mut value: u16, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}
