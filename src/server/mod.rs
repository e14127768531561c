mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;
pub use self::types::{ProcessRequest, ProcessResponse};

#[derive(OpenApi)]
#[openapi(
    paths(api::health_handler, api::process_handler, api::entry_handler, api::metrics_handler),
    components(schemas(types::ProcessRequest, types::ProcessResponse, types::HealthResponse)),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// 注册 `bearer` 鉴权方案
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health_handler))
        .route("/api/process-meme", post(api::process_handler))
        .route("/api/entries/{address}", get(api::entry_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 请求体限制：1M，向量再长也够用
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::api::tests::{FixedEmbedder, TOKEN, state_with};
    use super::*;

    const ADDRESS: &str = "BCqcy93X3Vo7to5aeFbFLfEYK9FciXmzGn8t4CDDFxcP";

    fn app() -> Router {
        create_app(state_with(Arc::new(FixedEmbedder(vec![1., 0., 0.]))))
    }

    fn process_request(token: Option<&str>) -> Request<Body> {
        let body = json!({
            "text": "gm",
            "imageVector": [0, 3, 4],
            "imageHash": "d4b2f9ea961f1c580b92fbea7a3496f30b14f420210b2556292e2fad631a529b",
        });
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/process-meme")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_health() {
        let resp = app().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_process_then_entry_and_metrics() {
        let app = app();

        let resp = app.clone().oneshot(process_request(Some(TOKEN))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["address"], ADDRESS);
        assert_eq!(body["bump"], 253);

        let resp = app.clone().oneshot(process_request(Some(TOKEN))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["error"], "duplicate_fingerprint");
        assert_eq!(body["existing"]["address"], ADDRESS);

        let resp = app.clone().oneshot(get(&format!("/api/entries/{ADDRESS}"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["verdict"], "pending");

        let resp = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("memecanon_registration_count"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_authorization() {
        let resp = app().oneshot(process_request(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app().oneshot(process_request(Some("wrong"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_entry() {
        let resp = app().oneshot(get(&format!("/api/entries/{ADDRESS}"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["error"], "not_found");
    }

    #[test]
    fn test_openapi_security_scheme() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(doc["components"]["securitySchemes"]["bearer"]["scheme"], "bearer");
        assert!(doc["paths"]["/api/process-meme"]["post"]["security"].is_array());
    }
}
