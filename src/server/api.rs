use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum_auth::AuthBearer;
use log::info;
use tokio::task::block_in_place;

use super::error::{AppError, Result, Unauthorized};
use super::state::AppState;
use super::types::*;
use crate::address::Address;
use crate::metrics;
use crate::registry::RegistryEntry;
use crate::submission::{Submission, process};

/// 请求携带的 bearer token，缺失或格式错误时直接返回 401
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let AuthBearer(token) =
            AuthBearer::from_request_parts(parts, state).await.map_err(|_| Unauthorized)?;
        Ok(Self(token))
    }
}

/// 健康检查
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, body = HealthResponse),
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string() })
}

/// 提交一条内容：计算文本向量和指纹，推导地址并注册
#[utoipa::path(
    post,
    path = "/api/process-meme",
    request_body = ProcessRequest,
    responses(
        (status = 200, body = ProcessResponse),
        (status = 400, description = "请求字段缺失或无效"),
        (status = 401, description = "token 无效"),
        (status = 409, description = "内容已注册，响应中附带已有条目"),
        (status = 503, description = "文本向量服务或账本暂时不可用"),
    ),
    security(("bearer" = []))
)]
pub async fn process_handler(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
    Json(data): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>> {
    if token != state.token {
        return Err(Unauthorized.into());
    }
    let parts = data.into_parts()?;

    let start = Instant::now();
    let text = state.embedder.embed_text(&parts.text).await?;
    metrics::observe_process_duration("embed", start.elapsed().as_secs_f32());
    info!("文本向量维度: {}, 耗时 {:.2?}", text.len(), start.elapsed());

    let start = Instant::now();
    let submission = Submission {
        image: parts.image,
        text,
        image_hash: Some(parts.image_hash),
        metadata: parts.metadata,
    };
    let processed = block_in_place(|| process(&state.registry, submission))?;
    metrics::observe_process_duration("register", start.elapsed().as_secs_f32());

    Ok(Json(processed.into()))
}

/// 查询地址上的注册条目
#[utoipa::path(
    get,
    path = "/api/entries/{address}",
    params(("address" = String, Path, description = "base58 编码的地址")),
    responses(
        (status = 200, description = "注册条目"),
        (status = 404, description = "地址上没有条目"),
    )
)]
pub async fn entry_handler(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<RegistryEntry>> {
    let address = address.parse::<Address>()?;
    let entry = block_in_place(|| state.registry.lookup(&address))?;
    Ok(Json(entry))
}

/// 导出 prometheus 指标
#[utoipa::path(get, path = "/metrics")]
pub async fn metrics_handler() -> Result<impl IntoResponse> {
    let body = metrics::gather_text()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
