//! 网关路由模块

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use gateway_common::models::{AccessRule, MethodPattern, Requirement};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

const GATEWAY_NAME: &str = "Fitness Platform API Gateway";
const GATEWAY_DESCRIPTION: &str = "API Gateway for the fitness platform microservices";

const FEATURES: &[&str] = &[
    "JWT Authentication",
    "Role-based Admission",
    "Request Routing",
    "CORS Support",
    "User Context Forwarding",
];

/// 创建网关路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/gateway/health", get(health_check))
        .route("/gateway/health/all", get(aggregated_health))
        .route("/gateway/info", get(gateway_info))
        .route("/gateway/routes", get(gateway_routes))
        .route("/actuator/health", get(actuator_health))
}

/// 网关健康检查
#[utoipa::path(
    get,
    path = "/gateway/health",
    tag = "health",
    responses(
        (status = 200, description = "网关运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// 存活探针
#[utoipa::path(
    get,
    path = "/actuator/health",
    tag = "health",
    responses(
        (status = 200, description = "网关存活", body = ProbeResponse)
    )
)]
pub async fn actuator_health() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "UP".to_string(),
    })
}

/// 聚合所有后端服务的健康检查
#[utoipa::path(
    get,
    path = "/gateway/health/all",
    tag = "health",
    responses(
        (status = 200, description = "聚合健康状态", body = AggregatedHealth)
    )
)]
pub async fn aggregated_health(State(state): State<AppState>) -> Json<AggregatedHealth> {
    let checks = state
        .routes
        .services()
        .into_iter()
        .map(|(name, url)| check_service_health(&state.http_client, name, url));
    let services = join_all(checks).await;

    let all_healthy = services.iter().all(|s| s.healthy);

    Json(AggregatedHealth {
        status: if all_healthy { "UP" } else { "DEGRADED" }.to_string(),
        timestamp: Utc::now(),
        services,
    })
}

async fn check_service_health(client: &reqwest::Client, name: &str, url: &str) -> ServiceHealth {
    let health_url = format!("{}/actuator/health", url);

    match client.get(&health_url).send().await {
        Ok(response) if response.status().is_success() => ServiceHealth {
            name: name.to_string(),
            url: url.to_string(),
            healthy: true,
            error: None,
        },
        Ok(response) => ServiceHealth {
            name: name.to_string(),
            url: url.to_string(),
            healthy: false,
            error: Some(format!("HTTP {}", response.status())),
        },
        Err(e) => {
            tracing::warn!(service = name, error = %e, "health probe failed");
            ServiceHealth {
                name: name.to_string(),
                url: url.to_string(),
                healthy: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// 网关信息
#[utoipa::path(
    get,
    path = "/gateway/info",
    tag = "gateway",
    responses(
        (status = 200, description = "网关与后端服务概览", body = GatewayInfo)
    )
)]
pub async fn gateway_info(State(state): State<AppState>) -> Json<GatewayInfo> {
    let services = state
        .routes
        .services()
        .into_iter()
        .map(|(name, url)| ServiceInfo {
            name: name.to_string(),
            url: url.to_string(),
            prefixes: state
                .routes
                .routes()
                .iter()
                .filter(|route| route.service == name)
                .map(|route| format!("{}/**", route.prefix))
                .collect(),
        })
        .collect();

    Json(GatewayInfo {
        name: GATEWAY_NAME.to_string(),
        description: GATEWAY_DESCRIPTION.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
        features: FEATURES.iter().map(|f| f.to_string()).collect(),
    })
}

/// 当前生效的访问规则
#[utoipa::path(
    get,
    path = "/gateway/routes",
    tag = "gateway",
    responses(
        (status = 200, description = "公开与受保护的路由", body = RoutesResponse)
    )
)]
pub async fn gateway_routes(State(state): State<AppState>) -> Json<RoutesResponse> {
    let (public, protected): (Vec<_>, Vec<_>) = state
        .security
        .policy
        .rules()
        .iter()
        .partition(|rule| rule.requirement == Requirement::Public);

    let entry = |rule: &AccessRule| RouteEntry {
        method: match &rule.method {
            MethodPattern::Any => "ANY".to_string(),
            MethodPattern::Exact(method) => method.to_string(),
        },
        path_prefix: rule.path_prefix.clone(),
        requirement: rule.requirement.to_string(),
    };
    let public_routes = public.into_iter().map(entry).collect();
    let protected_routes = protected.into_iter().map(entry).collect();

    Json(RoutesResponse {
        public_routes,
        protected_routes,
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
}

/// 探针响应
#[derive(Serialize, ToSchema)]
pub struct ProbeResponse {
    pub status: String,
}

/// 聚合健康响应
#[derive(Serialize, ToSchema)]
pub struct AggregatedHealth {
    /// 整体状态
    pub status: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 各服务健康状态
    pub services: Vec<ServiceHealth>,
}

/// 单个服务健康状态
#[derive(Serialize, ToSchema)]
pub struct ServiceHealth {
    /// 服务名称
    pub name: String,
    /// 服务地址
    pub url: String,
    /// 是否健康
    pub healthy: bool,
    /// 错误信息（如果不健康）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 网关信息响应
#[derive(Serialize, ToSchema)]
pub struct GatewayInfo {
    pub name: String,
    pub description: String,
    pub version: String,
    /// 后端服务及其路径前缀
    pub services: Vec<ServiceInfo>,
    pub features: Vec<String>,
}

/// 后端服务概览
#[derive(Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub url: String,
    pub prefixes: Vec<String>,
}

/// 路由列表响应
#[derive(Serialize, ToSchema)]
pub struct RoutesResponse {
    pub public_routes: Vec<RouteEntry>,
    pub protected_routes: Vec<RouteEntry>,
}

/// 一条访问规则
#[derive(Serialize, ToSchema)]
pub struct RouteEntry {
    /// HTTP 方法，`ANY` 表示不限
    pub method: String,
    /// 路径前缀
    pub path_prefix: String,
    /// public / authenticated / admin_only
    pub requirement: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use gateway_common::config::AppConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    // Nothing listens on the discard port.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn state_with_user_service(user_service: &str) -> AppState {
        let user_service = user_service.to_string();
        let config = AppConfig::from_source("api-gateway", &move |key: &str| match key {
            "JWT_SECRET" => Some("routes-test-secret".to_string()),
            "USER_SERVICE_URL" => Some(user_service.clone()),
            "WORKOUT_SERVICE_URL" | "GAMIFICATION_SERVICE_URL" => Some(UNREACHABLE.to_string()),
            _ => None,
        })
        .unwrap();
        AppState::new(config).unwrap()
    }

    async fn get_json(path: &str) -> (StatusCode, Value) {
        get_json_with(state_with_user_service(UNREACHABLE), path).await
    }

    async fn get_json_with(state: AppState, path: &str) -> (StatusCode, Value) {
        let response = router()
            .with_state(state)
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = get_json("/gateway/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
        assert_eq!(body["service"], "api-gateway");
    }

    #[tokio::test]
    async fn test_actuator_health() {
        let (status, body) = get_json("/actuator/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "UP"}));
    }

    #[tokio::test]
    async fn test_info_lists_backend_services() {
        let (_, body) = get_json("/gateway/info").await;
        let services = body["services"].as_array().unwrap();
        assert_eq!(services.len(), 3);
        assert_eq!(services[0]["name"], "user-service");
        assert_eq!(services[0]["prefixes"][0], "/api/v1/auth/**");
        assert!(body["features"]
            .as_array()
            .unwrap()
            .contains(&Value::from("JWT Authentication")));
    }

    #[tokio::test]
    async fn test_routes_split_by_requirement() {
        let (_, body) = get_json("/gateway/routes").await;

        let public = body["public_routes"].as_array().unwrap();
        assert!(public.iter().all(|r| r["requirement"] == "public"));
        assert!(public
            .iter()
            .any(|r| r["path_prefix"] == "/api/v1/auth/login" && r["method"] == "ANY"));
        assert!(public
            .iter()
            .any(|r| r["path_prefix"] == "/api/v1/exercises" && r["method"] == "GET"));

        let protected = body["protected_routes"].as_array().unwrap();
        assert!(protected
            .iter()
            .any(|r| r["path_prefix"] == "/api/admin" && r["requirement"] == "admin_only"));
    }

    #[tokio::test]
    async fn test_aggregated_health_reports_unreachable_backends() {
        let (status, body) = get_json("/gateway/health/all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "DEGRADED");

        let services = body["services"].as_array().unwrap();
        assert_eq!(services.len(), 3);
        assert!(services.iter().all(|s| s["healthy"] == false));
        assert!(services.iter().all(|s| s["error"].is_string()));
    }

    #[tokio::test]
    async fn test_aggregated_health_keeps_every_service_in_order() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let backend = Router::new().route("/actuator/health", get(actuator_health));
            axum::serve(listener, backend).await.unwrap();
        });

        let state = state_with_user_service(&format!("http://{addr}"));
        let (_, body) = get_json_with(state, "/gateway/health/all").await;
        assert_eq!(body["status"], "DEGRADED");

        let services = body["services"].as_array().unwrap();
        let names: Vec<_> = services.iter().map(|s| s["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["user-service", "workout-service", "gamification-service"]);
        assert_eq!(services[0]["healthy"], true);
        assert!(services[0].get("error").is_none());
        assert_eq!(services[1]["healthy"], false);
        assert_eq!(services[2]["healthy"], false);
    }
}
