//! 指纹计算
//!
//! 规范序列化：每个元素写成最短可往返的十进制文本（`.` 作小数点，无科学计数法，
//! 无分组符），元素之间用单个 `,` 连接，末尾无分隔符，按 UTF-8 编码后做 SHA-256。
//! 这一规则是对外约定的一部分，修改时必须新增 [`SchemeVersion`]。

use std::fmt;
use std::fmt::Write;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::error::{Error, Result};
use crate::vector::{CombinedVector, Vector, combine};

/// 32 字节摘要
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    pub const LEN: usize = 32;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| Error::InvalidInput(format!("无效的十六进制摘要 {s:?}: {e}")))?;
        Self::try_from(bytes.as_slice())
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::InvalidInput(format!("摘要长度应为 32 字节，实际为 {}", bytes.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

/// 指纹方案版本，不同版本的指纹永远不会被视为相等
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeVersion {
    /// SHA-256 + 逗号连接的最短十进制文本
    #[default]
    V1,
}

impl fmt::Display for SchemeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("v1"),
        }
    }
}

/// 按规范规则序列化向量
pub fn serialize_vector(values: &[f64]) -> String {
    let mut out = String::with_capacity(values.len() * 20);
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        // -0 写成 0，与数值相等的 0 保持同一序列化结果
        let v = if *v == 0. { 0. } else { *v };
        // f64 的 Display 输出最短可往返表示，且从不使用科学计数法
        write!(out, "{v}").expect("write to String never fails");
    }
    out
}

/// 计算向量摘要
pub fn hash_vector(values: &[f64]) -> Digest {
    hash_seed(serialize_vector(values).as_bytes())
}

/// 计算任意字节种子的摘要
pub fn hash_seed(seed: impl AsRef<[u8]>) -> Digest {
    Digest(Sha256::digest(seed.as_ref()).into())
}

/// 一次提交的指纹
///
/// `combined` 是提交的唯一身份，用于寻址；`image` 和 `text` 仅用于审计溯源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    #[serde(default)]
    pub scheme: SchemeVersion,
    pub image: Digest,
    pub text: Digest,
    pub combined: Digest,
}

/// 指纹及其组合向量
#[derive(Debug, Clone)]
pub struct Fingerprinted {
    pub fingerprint: Fingerprint,
    pub combined: CombinedVector,
}

impl Fingerprint {
    /// 计算指纹：溯源摘要基于原始向量，组合摘要基于归一化后的组合向量
    pub fn compute(image: &Vector, text: &Vector) -> Fingerprinted {
        let combined = combine(image, text);
        let fingerprint = Self {
            scheme: SchemeVersion::V1,
            image: hash_vector(image.as_slice()),
            text: hash_vector(text.as_slice()),
            combined: hash_vector(combined.as_slice()),
        };
        Fingerprinted { fingerprint, combined }
    }

    /// 校验客户端提交的图片摘要是否与图片向量一致
    pub fn verify_image_digest(&self, claimed: &Digest) -> Result<()> {
        if &self.image != claimed {
            return Err(Error::FingerprintMismatch(format!(
                "图片摘要 {claimed} 与图片向量的摘要 {} 不一致",
                self.image
            )));
        }
        Ok(())
    }

    /// 是否与另一个指纹指向同一份内容，方案版本不同时永远为 false
    pub fn same_content(&self, other: &Fingerprint) -> bool {
        self.scheme == other.scheme && self.combined == other.combined
    }
}
