//! API 网关服务
//!
//! 作为健身平台所有客户端请求的入口点，提供以下功能：
//! - 准入流水线：令牌认证、身份头传递、管理员角色校验
//! - 请求路由转发到对应的后端服务
//! - CORS 与请求 ID
//! - 请求/响应日志记录

mod proxy;
mod routes;
mod state;

use axum::{
    http::{header, Method},
    middleware,
    routing::get,
    Json, Router,
};
use gateway_common::config::AppConfig;
use gateway_common::middleware::{admission_pipeline, request_id_middleware};
use state::AppState;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "api-gateway";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "健身平台 API 网关",
        version = "0.1.0",
        description = "健身平台微服务 API 网关"
    ),
    paths(
        routes::health_check,
        routes::actuator_health,
        routes::aggregated_health,
        routes::gateway_info,
        routes::gateway_routes,
    ),
    components(schemas(
        routes::HealthResponse,
        routes::ProbeResponse,
        routes::AggregatedHealth,
        routes::ServiceHealth,
        routes::GatewayInfo,
        routes::ServiceInfo,
        routes::RoutesResponse,
        routes::RouteEntry,
    )),
    tags(
        (name = "gateway", description = "网关端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置（.env 可选，已存在的环境变量优先）
    dotenvy::dotenv().ok();
    let config = AppConfig::load_with_service(SERVICE_NAME)?;
    let addr = format!("{}:{}", config.host, config.port);

    // 创建应用状态
    let state = AppState::new(config)?;

    // 创建路由
    let app = create_router(state);

    // 启动服务
    info!(service = SERVICE_NAME, address = %addr, "启动 API 网关");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([header::AUTHORIZATION]);

    // 网关自身端点与代理 fallback 都位于准入流水线之后
    let admitted = admission_pipeline(
        Router::new()
            .merge(routes::router())
            .route("/api-docs/openapi.json", get(openapi_json))
            .fallback(proxy::forward),
        state.security.clone(),
    );

    admitted
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
