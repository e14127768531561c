//! 文本向量服务
//!
//! 向量模型本身不在本 crate 范围内，这里只提供 OpenAI 兼容接口的客户端。
//! 调用失败统一返回 `ProviderUnavailable`，不在内部重试。

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::EmbedOptions;
use crate::error::{Error, Result};
use crate::vector::Vector;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vector>;
}

/// OpenAI 兼容的 `/v1/embeddings` 客户端
pub struct OpenAiEmbedder {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiEmbedder {
    pub fn new(opts: &EmbedOptions) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            url: opts.embed_url.clone(),
            model: opts.embed_model.clone(),
            api_key: opts.api_key.clone().filter(|key| !key.is_empty()),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vector> {
        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            input: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f64>,
        }

        debug!("请求文本向量: model = {}, {} 字节", self.model, text.len());

        let mut req_builder = self.http_client.post(&self.url);
        if let Some(key) = &self.api_key {
            req_builder = req_builder.bearer_auth(key);
        }

        let response = req_builder
            .json(&Request { model: &self.model, input: text })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderUnavailable(format!("API 错误 {status}: {body}")));
        }

        let body: Response = response.json().await?;
        let embedding = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::ProviderUnavailable("响应中没有向量".to_string()))?
            .embedding;
        Vector::new(embedding)
    }
}
