use std::sync::Arc;

use crate::embed::Embedder;
use crate::registry::{FingerprintRegistry, Ledger};

/// 应用状态
pub struct AppState {
    /// 指纹注册表
    pub registry: FingerprintRegistry<Arc<dyn Ledger>>,
    /// 文本向量服务
    pub embedder: Arc<dyn Embedder>,
    /// 鉴权 token
    pub token: String,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(
        registry: FingerprintRegistry<Arc<dyn Ledger>>,
        embedder: Arc<dyn Embedder>,
        token: String,
    ) -> Arc<Self> {
        Arc::new(AppState { registry, embedder, token })
    }
}
