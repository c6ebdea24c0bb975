//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 `Arc`로 래핑되어 요청 간에 공유됩니다.
//! 인증 관련 구성 요소는 시작 후 변경되지 않습니다.

use nearchrist_core::{Adoration, Crusade, DeploymentProfile, Diocese, Parish, State};
use std::sync::Arc;

use crate::auth::{AccessPolicy, Authenticator, Clock, TokenCodec};
use crate::repository::{CredentialStore, DirectoryRepository, UserStore};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 토큰 발급/검증기
    pub codec: Arc<TokenCodec>,

    /// 시간 소스 (테스트에서는 수동 시계)
    pub clock: Arc<dyn Clock>,

    /// 경로 접근 정책
    pub policy: Arc<AccessPolicy>,

    /// 로그인 처리기
    pub authenticator: Arc<Authenticator>,

    /// 자격 증명 조회 (로그인 경로)
    pub credentials: Arc<dyn CredentialStore>,

    /// 사용자 관리 (`/users`)
    pub users: Arc<dyn UserStore>,

    pub states: Arc<DirectoryRepository<State>>,
    pub dioceses: Arc<DirectoryRepository<Diocese>>,
    pub parishes: Arc<DirectoryRepository<Parish>>,
    pub adorations: Arc<DirectoryRepository<Adoration>>,
    pub crusades: Arc<DirectoryRepository<Crusade>>,

    /// 배포 프로필
    pub profile: DeploymentProfile,

    /// 데이터베이스 연결 풀 (PostgreSQL 사용자 저장소를 쓰는 경우)
    pub db_pool: Option<sqlx::PgPool>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// `store`는 로그인과 사용자 관리에 함께 사용됩니다.
    pub fn new<S>(
        codec: TokenCodec,
        clock: Arc<dyn Clock>,
        profile: DeploymentProfile,
        store: Arc<S>,
    ) -> Self
    where
        S: UserStore + 'static,
    {
        let codec = Arc::new(codec);
        let credentials: Arc<dyn CredentialStore> = store.clone();
        let users: Arc<dyn UserStore> = store;
        let authenticator = Authenticator::new(
            Arc::clone(&credentials),
            Arc::clone(&codec),
            Arc::clone(&clock),
        );

        Self {
            codec,
            clock,
            policy: Arc::new(AccessPolicy::for_profile(profile)),
            authenticator: Arc::new(authenticator),
            credentials,
            users,
            states: Arc::new(DirectoryRepository::new()),
            dioceses: Arc::new(DirectoryRepository::new()),
            parishes: Arc::new(DirectoryRepository::new()),
            adorations: Arc::new(DirectoryRepository::new()),
            crusades: Arc::new(DirectoryRepository::new()),
            profile,
            db_pool: None,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 데이터베이스 연결 풀 설정 (readiness 확인용).
    pub fn with_db_pool(mut self, pool: sqlx::PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 신뢰하는 프록시 뒤에서 실행 중인지 설정합니다.
    ///
    /// 켜면 접근 정책이 `X-Forwarded-Proto`/`Forwarded` 헤더로 HTTPS 여부를 판단합니다.
    pub fn with_trusted_proxy(mut self, trusted: bool) -> Self {
        self.policy = Arc::new(
            AccessPolicy::for_profile(self.profile).with_forwarded_headers(trusted),
        );
        self
    }

    /// 서버 업타임(초) 반환.
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0)
    }

    /// 데이터베이스 연결 상태 확인. 풀이 없으면 `None`.
    pub async fn is_db_healthy(&self) -> Option<bool> {
        match &self.db_pool {
            Some(pool) => Some(sqlx::query("SELECT 1").fetch_one(pool).await.is_ok()),
            None => None,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("profile", &self.profile)
            .field("credentials", &self.credentials.backend())
            .field("db_pool", &self.db_pool.is_some())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
