//! 确定性地址推导
//!
//! 地址空间与 Solana 的程序派生地址一致：
//! `SHA-256(seed_0 ‖ … ‖ seed_n ‖ [bump] ‖ program_id ‖ "ProgramDerivedAddress")`，
//! 落在 Ed25519 曲线上的候选地址无效。bump 从 255 开始递减，取第一个有效值。

use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::CompressedEdwardsY;
use log::{debug, error};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::error::{Error, Result};
use crate::fingerprint::{Digest, hash_seed};

/// 单个种子的最大长度
pub const MAX_SEED_LEN: usize = 32;
/// 种子数量上限，包括前缀和 bump
pub const MAX_SEEDS: usize = 16;
/// 默认命名空间前缀
pub const DEFAULT_PREFIX: &str = "meme";
/// 默认程序 ID
pub const DEFAULT_PROGRAM_ID: &str = "EWDGViEZrieLvQ544usdPVLazkaUdaVhBPAqoEG3HA7b";

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// 32 字节地址，以 base58 展示
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// 是否为 Ed25519 曲线上的点
    pub fn is_on_curve(&self) -> bool {
        is_on_curve(&self.0)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|e| Error::InvalidInput(format!("无效的 base58 地址 {s:?}: {e}")))?;
        let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            Error::InvalidInput(format!("地址长度应为 32 字节，实际为 {}", bytes.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

/// 推导结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub address: Address,
    pub bump: u8,
}

/// 地址推导器，持有命名空间前缀和程序 ID，本身无可变状态
#[derive(Debug, Clone)]
pub struct AddressDeriver {
    program_id: Address,
    prefix: Vec<u8>,
}

impl Default for AddressDeriver {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID.parse().expect("default program id is valid base58"),
            prefix: DEFAULT_PREFIX.as_bytes().to_vec(),
        }
    }
}

impl AddressDeriver {
    pub fn new(program_id: Address, prefix: impl Into<Vec<u8>>) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.len() > MAX_SEED_LEN {
            return Err(Error::InvalidSeed(format!(
                "前缀长度 {} 超过 {MAX_SEED_LEN} 字节",
                prefix.len()
            )));
        }
        Ok(Self { program_id, prefix })
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// 由组合摘要和若干辅助摘要推导地址，种子顺序为 `前缀, seeds[0], seeds[1], …`
    pub fn derive(&self, seeds: &[Digest]) -> Result<DerivedAddress> {
        let mut all = Vec::with_capacity(seeds.len() + 1);
        all.push(self.prefix.as_slice());
        all.extend(seeds.iter().map(|d| d.as_bytes().as_slice()));
        self.find_address(&all)
    }

    /// 由组合摘要和可选的辅助种子字符串推导地址，辅助种子先做哈希以固定长度，空字符串视为没有种子
    pub fn derive_with_seed(&self, combined: &Digest, seed: Option<&str>) -> Result<DerivedAddress> {
        match seed.filter(|s| !s.is_empty()) {
            Some(seed) => self.derive(&[*combined, hash_seed(seed)]),
            None => self.derive(&[*combined]),
        }
    }

    /// 重新推导并比较地址
    pub fn verify(&self, address: &Address, combined: &Digest, seed: Option<&str>) -> Result<bool> {
        let derived = self.derive_with_seed(combined, seed)?;
        Ok(&derived.address == address)
    }

    /// 从 bump = 255 开始递减，寻找第一个不在曲线上的地址
    pub fn find_address(&self, seeds: &[&[u8]]) -> Result<DerivedAddress> {
        self.search_bumps(seeds, |candidate| !is_on_curve(candidate))
    }

    /// 使用指定 bump 计算地址，候选地址在曲线上时返回 `None`
    pub fn create_address(&self, seeds: &[&[u8]], bump: u8) -> Result<Option<Address>> {
        check_seeds(seeds)?;
        let candidate = self.candidate(seeds, bump);
        Ok((!is_on_curve(&candidate)).then_some(Address(candidate)))
    }

    fn search_bumps<F>(&self, seeds: &[&[u8]], is_valid: F) -> Result<DerivedAddress>
    where
        F: Fn(&[u8; 32]) -> bool,
    {
        check_seeds(seeds)?;
        for bump in (0..=u8::MAX).rev() {
            let candidate = self.candidate(seeds, bump);
            if is_valid(&candidate) {
                let address = Address(candidate);
                debug!("推导地址 {address}, bump = {bump}");
                return Ok(DerivedAddress { address, bump });
            }
        }
        error!("地址空间耗尽: {} 个种子", seeds.len());
        Err(Error::AddressSpaceExhausted)
    }

    fn candidate(&self, seeds: &[&[u8]], bump: u8) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update([bump]);
        hasher.update(self.program_id.as_bytes());
        hasher.update(PDA_MARKER);
        hasher.finalize().into()
    }
}

fn check_seeds(seeds: &[&[u8]]) -> Result<()> {
    // bump 本身也占用一个种子位置
    if seeds.len() + 1 > MAX_SEEDS {
        return Err(Error::InvalidSeed(format!("种子数量 {} 超过上限", seeds.len())));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(Error::InvalidSeed(format!(
            "种子长度 {} 超过 {MAX_SEED_LEN} 字节",
            seed.len()
        )));
    }
    Ok(())
}

fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}
