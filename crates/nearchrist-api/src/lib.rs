//! NearChrist 디렉터리 API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API (디렉터리 CRUD, 사용자 관리)
//! - Bearer 토큰 인증과 경로 기반 접근 정책
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: 토큰, 로그인, 게이트키퍼, 접근 정책
//! - [`repository`]: 사용자/디렉터리 저장소
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어
//! - [`openapi`]: OpenAPI 문서

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod state;

pub use auth::{
    AccessDecision, AccessPolicy, Authenticator, Clock, CurrentUser, ExecutionContext,
    ManualClock, SystemClock, TokenCodec, TokenError,
};
pub use error::{ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::http_metrics_middleware;
pub use routes::{create_api_router, create_gateway_router};
pub use state::AppState;
