use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::fingerprint::Digest;
use crate::registry::{CommitReceipt, Metadata, Provenance};
use crate::submission::Processed;
use crate::vector::Vector;

/// 提交请求
///
/// 所有字段都声明为可选，缺失的必填字段在 [`ProcessRequest::into_parts`] 中报告为 `MissingField`
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    /// 文本内容，用于计算文本向量
    pub text: Option<String>,
    /// 客户端计算的图片向量
    pub image_vector: Option<Vec<f64>>,
    /// 图片向量的摘要（十六进制）
    pub image_hash: Option<String>,
    /// 提交者身份
    pub submitter: Option<String>,
    /// 外部内容定位符
    pub content_locator: Option<String>,
    /// 外部元数据定位符
    pub metadata_locator: Option<String>,
    /// 辅助种子
    pub seed: Option<String>,
}

/// 校验后的请求
#[derive(Debug)]
pub struct ProcessParts {
    pub text: String,
    pub image: Vector,
    pub image_hash: Digest,
    pub metadata: Metadata,
}

impl ProcessRequest {
    pub fn into_parts(self) -> Result<ProcessParts> {
        let text = self.text.filter(|t| !t.is_empty()).ok_or(Error::MissingField("text"))?;
        let image_vector = self.image_vector.ok_or(Error::MissingField("imageVector"))?;
        let image_hash =
            self.image_hash.filter(|h| !h.is_empty()).ok_or(Error::MissingField("imageHash"))?;

        Ok(ProcessParts {
            text,
            image: Vector::new(image_vector)?,
            image_hash: image_hash.parse()?,
            metadata: Metadata {
                provenance: Provenance {
                    submitter: self.submitter.unwrap_or_default(),
                    content_locator: self.content_locator.unwrap_or_default(),
                    metadata_locator: self.metadata_locator.unwrap_or_default(),
                },
                seed: self.seed.filter(|s| !s.is_empty()),
            },
        })
    }
}

/// 提交响应
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    /// 原始文本向量
    pub text_vector: Vec<f64>,
    /// 归一化后的组合向量（图片在前）
    pub combined_vector: Vec<f64>,
    /// 图片向量摘要
    #[schema(value_type = String)]
    pub image_hash: Digest,
    /// 文本向量摘要
    #[schema(value_type = String)]
    pub text_hash: Digest,
    /// 组合向量摘要，即提交的唯一身份
    #[schema(value_type = String)]
    pub combined_hash: Digest,
    /// 注册地址（base58）
    #[schema(value_type = String)]
    pub address: Address,
    /// 地址推导使用的 bump
    pub bump: u8,
    /// 账本提交回执
    #[schema(value_type = String)]
    pub commit_receipt: CommitReceipt,
}

impl From<Processed> for ProcessResponse {
    fn from(processed: Processed) -> Self {
        let fingerprint = processed.fingerprinted.fingerprint;
        let entry = processed.registration.entry;
        Self {
            text_vector: processed.text.into(),
            combined_vector: processed.fingerprinted.combined.as_slice().to_vec(),
            image_hash: fingerprint.image,
            text_hash: fingerprint.text,
            combined_hash: fingerprint.combined,
            address: entry.address,
            bump: entry.bump,
            commit_receipt: processed.registration.receipt,
        }
    }
}

/// 健康检查响应
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}
