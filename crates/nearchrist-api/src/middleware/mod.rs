//! API 서버용 HTTP middleware.
//!
//! 인증 관련 미들웨어는 [`crate::auth`]에 있습니다.

mod metrics;
mod rate_limit;

pub use metrics::{http_metrics_middleware, route_label};
pub use rate_limit::{
    rate_limit_middleware, RateLimitConfig, RateLimitResult, RateLimitState, RateLimiter,
};
