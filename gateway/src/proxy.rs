//! 反向代理模块
//!
//! 按路径前缀把已通过准入流水线的请求转发到后端服务。

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName},
    response::Response,
};
use gateway_common::config::ServiceUrls;
use gateway_common::errors::{AppError, AppResult};
use http_body_util::LengthLimitError;

use crate::state::AppState;

/// 转发请求体的上限
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const USER_SERVICE: &str = "user-service";
pub const WORKOUT_SERVICE: &str = "workout-service";
pub const GAMIFICATION_SERVICE: &str = "gamification-service";

const USER_PREFIXES: &[&str] = &["/api/v1/auth", "/api/v1/users"];

const WORKOUT_PREFIXES: &[&str] = &[
    "/api/v1/workouts",
    "/api/v1/exercises",
    "/api/v1/muscle-groups",
    "/api/v1/workout-plans",
    "/api/v1/routine-folders",
    "/api/v1/analytics",
    "/api/admin",
];

const GAMIFICATION_PREFIXES: &[&str] = &[
    "/api/badges",
    "/api/champions",
    "/api/quests",
    "/api/users",
];

/// 一条后端路由
#[derive(Debug, Clone)]
pub struct BackendRoute {
    /// 路径前缀
    pub prefix: &'static str,
    /// 服务名称
    pub service: &'static str,
    /// 服务地址
    pub base_url: String,
}

/// 后端路由表，按顺序匹配
#[derive(Debug, Clone)]
pub struct BackendRoutes {
    routes: Vec<BackendRoute>,
}

impl BackendRoutes {
    pub fn from_service_urls(urls: &ServiceUrls) -> Self {
        let groups = [
            (USER_SERVICE, &urls.user_service, USER_PREFIXES),
            (WORKOUT_SERVICE, &urls.workout_service, WORKOUT_PREFIXES),
            (
                GAMIFICATION_SERVICE,
                &urls.gamification_service,
                GAMIFICATION_PREFIXES,
            ),
        ];

        let routes = groups
            .into_iter()
            .flat_map(|(service, base_url, prefixes)| {
                prefixes.iter().map(move |prefix| BackendRoute {
                    prefix: *prefix,
                    service,
                    base_url: base_url.clone(),
                })
            })
            .collect();

        Self { routes }
    }

    /// 第一条前缀匹配的路由
    pub fn resolve(&self, path: &str) -> Option<&BackendRoute> {
        self.routes.iter().find(|route| path.starts_with(route.prefix))
    }

    pub fn routes(&self) -> &[BackendRoute] {
        &self.routes
    }

    /// 去重后的 (服务名称, 地址) 列表
    pub fn services(&self) -> Vec<(&'static str, &str)> {
        let mut services: Vec<(&'static str, &str)> = Vec::new();
        for route in &self.routes {
            if !services.iter().any(|(name, _)| *name == route.service) {
                services.push((route.service, &route.base_url));
            }
        }
        services
    }
}

/// 逐跳头部，不跨越代理转发
static HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || name.as_str() == "keep-alive"
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) {
            forwarded.append(name.clone(), value.clone());
        }
    }
    forwarded
}

/// 读取请求体；超过 `limit` 返回 413
async fn read_body(body: Body, limit: usize) -> AppResult<Bytes> {
    to_bytes(body, limit).await.map_err(|e| {
        if exceeds_limit(&e) {
            AppError::PayloadTooLarge(limit)
        } else {
            AppError::BadRequest(e.to_string())
        }
    })
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// 代理处理器，作为网关路由的 fallback
pub async fn forward(State(state): State<AppState>, req: Request) -> AppResult<Response> {
    let path = req.uri().path().to_string();
    let route = state
        .routes
        .resolve(&path)
        .ok_or_else(|| AppError::RouteNotFound(path.clone()))?;

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(path.as_str());
    let url = format!("{}{}", route.base_url, path_and_query);

    let (parts, body) = req.into_parts();
    let body = read_body(body, MAX_BODY_BYTES).await?;

    tracing::debug!(
        service = route.service,
        method = %parts.method,
        url = %url,
        "forwarding request"
    );

    let upstream = state
        .http_client
        .request(parts.method, &url)
        .headers(forwardable(&parts.headers))
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(service = route.service, url = %url, error = %e, "upstream request failed");
            AppError::Upstream(format!("{} unavailable", route.service))
        })?;

    let status = upstream.status();
    let headers = forwardable(upstream.headers());
    let bytes = upstream.bytes().await.map_err(|e| {
        tracing::warn!(service = route.service, error = %e, "upstream body read failed");
        AppError::Upstream(format!("{} sent an unreadable response", route.service))
    })?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
