//! 로그인 시도 rate limiting.
//!
//! 클라이언트 IP별 Token Bucket으로 `/auth/login` 요청 빈도를 제한합니다.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use nearchrist_core::RateLimitSettings;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ApiErrorResponse;

/// Rate Limiter 설정.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 분당 최대 요청 수
    pub requests_per_minute: u32,
    /// 버스트 허용량
    pub burst_size: u32,
    /// 유휴 버킷 정리 기준
    pub cleanup_interval: Duration,
    /// `X-Forwarded-For`/`X-Real-IP`로 클라이언트를 구분할지 여부
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 10,
            burst_size: 5,
            cleanup_interval: Duration::from_secs(300),
            trust_forwarded_headers: false,
        }
    }
}

impl RateLimitConfig {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            burst_size: (requests_per_minute / 2).max(1),
            ..Default::default()
        }
    }

    /// 버스트 없는 설정.
    pub fn strict(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            burst_size: 0,
            ..Default::default()
        }
    }

    /// 설정 파일 값으로 만듭니다. 비활성화되어 있으면 `None`.
    pub fn from_settings(settings: &RateLimitSettings) -> Option<Self> {
        if settings.disabled || settings.login_requests_per_minute == 0 {
            return None;
        }
        Some(Self::new(settings.login_requests_per_minute))
    }

    /// 신뢰하는 프록시 뒤에서는 프록시가 붙인 클라이언트 주소로 버킷을 나눕니다.
    pub fn with_forwarded_headers(mut self, trusted: bool) -> Self {
        self.trust_forwarded_headers = trusted;
        self
    }
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    max_tokens: f64,
    /// 초당 리필 토큰 수
    refill_rate: f64,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig) -> Self {
        let refill_rate = f64::from(config.requests_per_minute) / 60.0;
        let max_tokens = (refill_rate + f64::from(config.burst_size)).max(1.0);

        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    fn seconds_until_next_token(&self) -> u64 {
        if self.tokens >= 1.0 || self.refill_rate <= 0.0 {
            0
        } else {
            ((1.0 - self.tokens) / self.refill_rate).ceil() as u64
        }
    }
}

/// IP별 Rate Limiter.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<RwLock<HashMap<IpAddr, TokenBucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 요청 허용 여부 확인.
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        let mut buckets = self.buckets.write().await;

        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(&self.config));

        if bucket.try_acquire() {
            RateLimitResult::Allowed
        } else {
            RateLimitResult::Limited {
                retry_after: bucket.seconds_until_next_token().max(1),
            }
        }
    }

    /// 오래된 버킷 정리.
    pub async fn cleanup(&self) {
        let mut buckets = self.buckets.write().await;
        let Some(threshold) = Instant::now().checked_sub(self.config.cleanup_interval) else {
            return;
        };

        buckets.retain(|_, bucket| bucket.last_refill > threshold);
    }

    /// 현재 추적 중인 IP 수.
    pub async fn tracked_ips(&self) -> usize {
        self.buckets.read().await.len()
    }
}

/// Rate Limit 확인 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited {
        /// 재시도까지 대기 시간 (초)
        retry_after: u64,
    },
}

/// Rate Limit 미들웨어 상태.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: RateLimiter,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: RateLimiter::new(config),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// 주기적으로 유휴 버킷을 정리하는 태스크를 시작합니다.
    pub fn spawn_cleanup(&self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        let limiter = self.limiter.clone();
        let period = limiter.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Rate limit cleanup task stopped");
                        break;
                    }
                    _ = ticker.tick() => limiter.cleanup().await,
                }
            }
        })
    }
}

/// Rate Limiting 미들웨어 함수.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request, state.limiter.config.trust_forwarded_headers);

    match state.limiter.check(ip).await {
        RateLimitResult::Allowed => {
            counter!("rate_limit_requests_total", "status" => "allowed").increment(1);
            next.run(request).await
        }
        RateLimitResult::Limited { retry_after } => {
            counter!("rate_limit_requests_total", "status" => "limited").increment(1);
            warn!(client_ip = %ip, retry_after, "Login rate limit exceeded");

            let body = ApiErrorResponse::with_details(
                "RATE_LIMITED",
                "Too many login attempts. Please try again later.",
                serde_json::json!({ "retryAfter": retry_after }),
            );
            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}

/// 요청에서 클라이언트 IP 추출.
///
/// 프록시를 신뢰하면 `X-Forwarded-For`, `X-Real-IP`, 연결 주소 순으로 확인합니다.
/// 그렇지 않으면 클라이언트가 바꿀 수 있는 헤더는 무시하고 연결 주소만 씁니다.
fn extract_client_ip(request: &Request, trust_forwarded: bool) -> IpAddr {
    if trust_forwarded {
        if let Some(ip) = forwarded_client_ip(request) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn forwarded_client_ip(request: &Request) -> Option<IpAddr> {
    let headers = request.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok());

    forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}
