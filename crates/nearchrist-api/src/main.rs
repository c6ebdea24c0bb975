//! NearChrist 디렉터리 API 서버.
//!
//! 설정을 로드하고 게이트웨이(게이트키퍼 → 접근 정책)를 거치는 REST API를 시작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use nearchrist_api::auth::{SystemClock, TokenCodec};
use nearchrist_api::metrics::setup_metrics_recorder;
use nearchrist_api::middleware::{http_metrics_middleware, RateLimitConfig, RateLimitState};
use nearchrist_api::openapi::openapi_router;
use nearchrist_api::repository::{InMemoryUserStore, NewUser, PgUserStore};
use nearchrist_api::routes::create_gateway_router;
use nearchrist_api::state::AppState;
use nearchrist_core::{init_logging, AppConfig, CorsConfig, LogConfig, Role};

/// CORS 레이어 생성.
///
/// 허용 origin이 설정되지 않으면 모든 origin을 허용합니다 (개발용).
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let restricted = !origins.is_empty();
    let allow_origin = if restricted {
        info!("CORS configured with {} allowed origins", origins.len());
        AllowOrigin::list(origins)
    } else {
        if !config.origins.is_empty() {
            warn!("cors.origins is set but contains no valid origins, allowing any");
        } else {
            warn!("cors.origins not set, allowing any origin (development mode)");
        }
        AllowOrigin::any()
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        // 명시적인 origin 목록이 있을 때만 자격 증명 허용
        .allow_credentials(restricted)
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 설정에 따라 사용자 저장소를 선택해 AppState를 생성합니다.
async fn create_app_state(config: &AppConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let codec = TokenCodec::new(
        &config.auth.signing_secret(),
        config.auth.issuer.clone(),
        config.auth.token_ttl(),
    );
    let clock = Arc::new(SystemClock);
    let profile = config.auth.profile;

    if let Some(url) = config.database.url.as_deref() {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to database");
                e
            })?;
        info!(
            max_connections = config.database.max_connections,
            "Connected to PostgreSQL user store"
        );

        if config.auth.bootstrap_admin_email.is_some() {
            warn!("Bootstrap admin is ignored when the PostgreSQL user store is used");
        }

        let store = Arc::new(PgUserStore::new(pool.clone()));
        return Ok(AppState::new(codec, clock, profile, store).with_db_pool(pool));
    }

    let mut seed = Vec::new();
    if let (Some(email), Some(password)) = (
        config.auth.bootstrap_admin_email.as_deref(),
        config.auth.bootstrap_admin_password.as_ref(),
    ) {
        seed.push(NewUser::with_password(
            "Administrator",
            email,
            password.expose_secret(),
            [Role::admin()],
        )?);
        info!("Bootstrap admin seeded into in-memory user store");
    } else {
        warn!("No bootstrap admin configured; in-memory user store starts empty");
    }

    let store = Arc::new(InMemoryUserStore::with_users(seed)?);
    Ok(AppState::new(codec, clock, profile, store))
}

/// 전체 라우터 생성.
fn create_router(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    login_limit: Option<RateLimitState>,
    config: &AppConfig,
) -> Router {
    // 메트릭 라우터 (게이트웨이 바깥)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(openapi_router())
        .merge(create_gateway_router(state, login_limit))
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_secs),
        ))
        .layer(cors_layer(&config.cors))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default()?;
    init_logging(LogConfig::from_settings(&config.logging))?;
    config.validate()?;

    info!(profile = %config.auth.profile, "Starting NearChrist API server...");

    if config.uses_fallback_secret() {
        warn!("auth.jwt_secret not set, using development fallback (INSECURE)");
    }
    if config.auth.profile.requires_secure_transport() {
        info!("Prod profile: plaintext requests will be rejected");
    }

    let metrics_handle = setup_metrics_recorder()?;
    info!("Prometheus metrics recorder initialized");

    let addr = config.server.socket_addr().map_err(|e| {
        error!(
            host = %config.server.host,
            port = config.server.port,
            error = %e,
            "소켓 주소 설정이 유효하지 않습니다. NEARCHRIST__SERVER__HOST, NEARCHRIST__SERVER__PORT를 확인하세요."
        );
        e
    })?;

    let trust_proxy = config.server.trust_forwarded_headers;
    if trust_proxy {
        info!("Trusting X-Forwarded-* headers from upstream proxy");
    }

    let state = Arc::new(
        create_app_state(&config)
            .await?
            .with_trusted_proxy(trust_proxy),
    );
    info!(
        version = %state.version,
        credentials = state.credentials.backend(),
        has_db = state.db_pool.is_some(),
        "Application state initialized"
    );

    // 전역 종료 토큰 (백그라운드 태스크 종료용)
    let shutdown_token = CancellationToken::new();

    let login_limit = match RateLimitConfig::from_settings(&config.rate_limit) {
        Some(limit) => {
            let limit = limit.with_forwarded_headers(trust_proxy);
            info!(
                requests_per_minute = limit.requests_per_minute,
                "Login rate limiting configured"
            );
            let state = RateLimitState::new(limit);
            state.spawn_cleanup(shutdown_token.clone());
            Some(state)
        }
        None => {
            info!("Login rate limiting DISABLED");
            None
        }
    };

    let app = create_router(state, metrics_handle, login_limit, &config);

    info!(%addr, "API server listening");
    info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
    .await?;

    shutdown_token.cancel();
    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
/// 시그널 핸들러 설치에 실패하면 해당 시그널은 기다리지 않습니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
