use thiserror::Error;

use crate::registry::RegistryEntry;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// 错误类别，用于日志、指标和 HTTP 状态码映射
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidVector,
    InvalidSeed,
    InvalidInput,
    AddressSpaceExhausted,
    DuplicateFingerprint,
    FingerprintMismatch,
    SchemeMismatch,
    InvalidScore,
    InvalidProvenance,
    InvalidTransition,
    NotFound,
    MissingField,
    LedgerUnavailable,
    ProviderUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidVector => "invalid_vector",
            Self::InvalidSeed => "invalid_seed",
            Self::InvalidInput => "invalid_input",
            Self::AddressSpaceExhausted => "address_space_exhausted",
            Self::DuplicateFingerprint => "duplicate_fingerprint",
            Self::FingerprintMismatch => "fingerprint_mismatch",
            Self::SchemeMismatch => "scheme_mismatch",
            Self::InvalidScore => "invalid_score",
            Self::InvalidProvenance => "invalid_provenance",
            Self::InvalidTransition => "invalid_transition",
            Self::NotFound => "not_found",
            Self::MissingField => "missing_field",
            Self::LedgerUnavailable => "ledger_unavailable",
            Self::ProviderUnavailable => "provider_unavailable",
        }
    }

    /// 是否为暂时性错误，调用方可以在更上层重试
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::LedgerUnavailable | Self::ProviderUnavailable)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("无效的向量: {0}")]
    InvalidVector(String),
    #[error("无效的种子: {0}")]
    InvalidSeed(String),
    /// 摘要、地址等文本格式不合法
    #[error("无效的输入: {0}")]
    InvalidInput(String),
    #[error("地址空间耗尽: 所有 bump 均无法生成有效地址")]
    AddressSpaceExhausted,
    #[error("指纹已注册: {}", .0.address)]
    DuplicateFingerprint(Box<RegistryEntry>),
    #[error("指纹不匹配: {0}")]
    FingerprintMismatch(String),
    #[error("指纹方案不一致: 已存储 {stored}, 提交 {submitted}")]
    SchemeMismatch { stored: String, submitted: String },
    #[error("无效的评分: {0}，范围应为 0 到 100")]
    InvalidScore(u32),
    #[error("无效的溯源信息: {0}")]
    InvalidProvenance(String),
    #[error("无效的状态转换: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("未找到: {0}")]
    NotFound(String),
    #[error("缺少必填字段: {0}")]
    MissingField(&'static str),
    #[error("账本不可用: {0}")]
    LedgerUnavailable(String),
    #[error("向量服务不可用: {0}")]
    ProviderUnavailable(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidVector(_) => ErrorKind::InvalidVector,
            Self::InvalidSeed(_) => ErrorKind::InvalidSeed,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::AddressSpaceExhausted => ErrorKind::AddressSpaceExhausted,
            Self::DuplicateFingerprint(_) => ErrorKind::DuplicateFingerprint,
            Self::FingerprintMismatch(_) => ErrorKind::FingerprintMismatch,
            Self::SchemeMismatch { .. } => ErrorKind::SchemeMismatch,
            Self::InvalidScore(_) => ErrorKind::InvalidScore,
            Self::InvalidProvenance(_) => ErrorKind::InvalidProvenance,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::LedgerUnavailable(_) => ErrorKind::LedgerUnavailable,
            Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
        }
    }
}

impl From<heed::Error> for Error {
    fn from(err: heed::Error) -> Self {
        Self::LedgerUnavailable(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Self::LedgerUnavailable(format!("账本数据损坏: {err}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::ProviderUnavailable(err.to_string())
    }
}
