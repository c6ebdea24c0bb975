//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/auth/login`, `/auth/me` - 인증
//! - `/health`, `/health/ready` - 헬스 체크
//! - `/states`, `/dioceses`, `/parishes`, `/adorations`, `/crusades` - 디렉터리
//! - `/users`, `/roles` - 사용자 관리
//!
//! 모든 라우트는 게이트키퍼와 접근 정책을 거칩니다.
//! `/metrics`와 OpenAPI 문서는 `main`에서 게이트웨이 바깥에 붙습니다.

pub mod auth;
pub mod directory;
pub mod health;
pub mod users;

pub use auth::{auth_router, login_router, LoginRequest, LoginResponse};
pub use directory::{directory_router, resource_router, DirectoryResource};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use users::{roles_router, users_router, UserUpsertRequest};

use axum::{middleware, Router};
use std::sync::Arc;

use crate::auth::{access_policy_middleware, gatekeeper_middleware};
use crate::middleware::{rate_limit_middleware, RateLimitState};
use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// `login_limit`이 있으면 `/auth/login`에만 rate limit이 적용됩니다.
pub fn create_api_router(login_limit: Option<RateLimitState>) -> Router<Arc<AppState>> {
    let login = match login_limit {
        Some(limit) => {
            login_router().route_layer(middleware::from_fn_with_state(limit, rate_limit_middleware))
        }
        None => login_router(),
    };

    Router::new()
        .nest("/auth", login.merge(auth_router()))
        .nest("/health", health_router())
        .nest("/users", users_router())
        .nest("/roles", roles_router())
        .merge(directory_router())
}

/// 게이트웨이 라우터 생성.
///
/// 요청 순서: 게이트키퍼 → 접근 정책 → 핸들러.
/// 라우트가 없는 경로도 정책을 거치므로 익명 요청은 404 대신 401을 받을 수 있습니다.
pub fn create_gateway_router(state: Arc<AppState>, login_limit: Option<RateLimitState>) -> Router {
    create_api_router(login_limit)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            access_policy_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            gatekeeper_middleware,
        ))
        .with_state(state)
}
