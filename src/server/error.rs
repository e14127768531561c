use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;

use crate::error::{Error, ErrorKind};

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// API错误类型
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

/// 鉴权失败
#[derive(Debug, thiserror::Error)]
#[error("无效的 token")]
pub struct Unauthorized;

impl AppError {
    fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<Unauthorized>().is_some() {
            return StatusCode::UNAUTHORIZED;
        }
        let Some(err) = self.0.downcast_ref::<Error>() else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match err.kind() {
            ErrorKind::InvalidVector
            | ErrorKind::InvalidSeed
            | ErrorKind::InvalidInput
            | ErrorKind::MissingField
            | ErrorKind::FingerprintMismatch
            | ErrorKind::InvalidProvenance
            | ErrorKind::InvalidScore => StatusCode::BAD_REQUEST,
            ErrorKind::DuplicateFingerprint | ErrorKind::SchemeMismatch => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::LedgerUnavailable | ErrorKind::ProviderUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorKind::AddressSpaceExhausted | ErrorKind::InvalidTransition => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("请求处理失败: {:#}", self.0);
        }
        let body = match self.0.downcast_ref::<Error>() {
            // 重复提交不是系统错误，附带已有条目以便调用方直接使用
            Some(Error::DuplicateFingerprint(existing)) => json!({
                "error": ErrorKind::DuplicateFingerprint.as_str(),
                "details": self.0.to_string(),
                "existing": existing,
            }),
            Some(err) => json!({
                "error": err.kind().as_str(),
                "details": err.to_string(),
            }),
            None => json!({
                "error": "internal",
                "details": format!("Something went wrong: {}", self.0),
            }),
        };
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
