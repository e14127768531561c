use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;

/// 溯源字段的最大长度，账本为每个字符串预留 100 字节
pub const MAX_LOCATOR_LEN: usize = 100;

/// 审核结论
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    #[default]
    Pending,
    Canonical,
    Derivative,
    Rejected,
}

impl Verdict {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// 只允许 Pending -> {Canonical, Derivative, Rejected}
    pub fn can_transition_to(&self, next: Verdict) -> bool {
        *self == Self::Pending && next.is_terminal()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Canonical => "canonical",
            Self::Derivative => "derivative",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// 正统评分，取值 0 到 100
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CanonScore(u32);

impl CanonScore {
    pub const MAX: u32 = 100;

    pub fn new(score: u32) -> Result<Self> {
        if score > Self::MAX {
            return Err(Error::InvalidScore(score));
        }
        Ok(Self(score))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for CanonScore {
    type Error = Error;

    fn try_from(score: u32) -> Result<Self> {
        Self::new(score)
    }
}

impl From<CanonScore> for u32 {
    fn from(score: CanonScore) -> Self {
        score.0
    }
}

/// 提交的溯源信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// 提交者身份
    pub submitter: String,
    /// 外部内容定位符，例如代币合约地址
    pub content_locator: String,
    /// 外部元数据定位符，例如元数据 URI
    pub metadata_locator: String,
}

impl Provenance {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("submitter", &self.submitter),
            ("contentLocator", &self.content_locator),
            ("metadataLocator", &self.metadata_locator),
        ] {
            if value.len() > MAX_LOCATOR_LEN {
                return Err(Error::InvalidProvenance(format!(
                    "{name} 长度 {} 超过 {MAX_LOCATOR_LEN} 字节",
                    value.len()
                )));
            }
        }
        Ok(())
    }
}

/// 注册表条目，提交后只追加、不删除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub address: Address,
    pub bump: u8,
    pub fingerprint: Fingerprint,
    pub verdict: Verdict,
    pub canon_score: CanonScore,
    pub provenance: Provenance,
    /// 创建时间，unix 秒
    pub created_at: u64,
}

impl RegistryEntry {
    /// 新建待审核条目
    pub fn pending(
        address: Address,
        bump: u8,
        fingerprint: Fingerprint,
        provenance: Provenance,
        created_at: u64,
    ) -> Self {
        Self {
            address,
            bump,
            fingerprint,
            verdict: Verdict::Pending,
            canon_score: CanonScore::default(),
            provenance,
            created_at,
        }
    }

    /// 写入审核结论，结论一经确定不可再修改
    pub fn apply_verdict(&mut self, verdict: Verdict, score: CanonScore) -> Result<()> {
        if !self.verdict.can_transition_to(verdict) {
            return Err(Error::InvalidTransition {
                from: self.verdict.to_string(),
                to: verdict.to_string(),
            });
        }
        self.verdict = verdict;
        self.canon_score = score;
        Ok(())
    }
}

/// 账本提交回执：条目 bincode 编码的 blake3 哈希
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitReceipt(String);

impl CommitReceipt {
    pub fn for_entry(entry: &RegistryEntry) -> Result<Self> {
        let bytes = bincode::serialize(entry)?;
        Ok(Self(blake3::hash(&bytes).to_hex().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
