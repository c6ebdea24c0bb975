//! 설정 관리.
//!
//! 설정은 다음 순서로 병합됩니다 (뒤가 우선):
//! 1. 코드 기본값
//! 2. `config/default.toml` (없으면 생략)
//! 3. `NEARCHRIST__SECTION__KEY` 형식의 환경 변수

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::domain::DeploymentProfile;
use crate::error::{DirectoryError, DirectoryResult};

/// 운영 환경에서 요구하는 서명 키 최소 길이 (바이트).
pub const MIN_SECRET_LEN: usize = 32;

/// 토큰 유효 기간 상한 (30일, 분 단위).
pub const MAX_TOKEN_TTL_MINUTES: i64 = 30 * 24 * 60;

/// 개발용 기본 서명 키. 운영 프로필에서는 거부됩니다.
pub const DEV_FALLBACK_SECRET: &str = "nearchrist-dev-secret-change-me-in-production";

/// 애플리케이션 설정.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 인증 설정
    pub auth: AuthConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// CORS 설정
    pub cors: CorsConfig,
    /// 로그인 요청 제한 설정
    pub rate_limit: RateLimitSettings,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 앞단 프록시의 `X-Forwarded-*` 헤더를 신뢰할지 여부.
    /// 클라이언트가 서버에 직접 닿을 수 없는 배포에서만 켭니다.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

impl ServerConfig {
    /// `host:port` 소켓 주소.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// 인증 설정.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// 배포 프로필 (dev | prod)
    pub profile: DeploymentProfile,
    /// HS256 서명 키
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub jwt_secret: Option<SecretString>,
    /// 토큰 발급자 (`iss`)
    pub issuer: String,
    /// 토큰 유효 기간 (분)
    pub token_ttl_minutes: i64,
    /// 시작 시 생성할 관리자 이메일 (인메모리 저장소 전용)
    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,
    /// 시작 시 생성할 관리자 비밀번호
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub bootstrap_admin_password: Option<SecretString>,
}

impl AuthConfig {
    /// 실제로 사용할 서명 키.
    ///
    /// 개발 프로필에서 키가 없으면 [`DEV_FALLBACK_SECRET`]을 사용합니다.
    /// 운영 프로필의 키 검증은 [`AppConfig::validate`]가 담당합니다.
    pub fn signing_secret(&self) -> SecretString {
        match &self.jwt_secret {
            Some(secret) => SecretString::from(secret.expose_secret().to_owned()),
            None => SecretString::from(DEV_FALLBACK_SECRET.to_owned()),
        }
    }

    /// 토큰 유효 기간.
    ///
    /// [`AppConfig::validate`]를 거치지 않은 값은 `0..=MAX_TOKEN_TTL_MINUTES` 범위로 잘립니다.
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes.clamp(0, MAX_TOKEN_TTL_MINUTES))
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL 연결 URL. 없으면 인메모리 저장소를 사용합니다.
    #[serde(default)]
    pub url: Option<String>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 획득 타임아웃 (초)
    pub acquire_timeout_secs: u64,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

/// CORS 설정.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// 허용 origin 목록. 비어 있으면 모든 origin을 허용합니다 (개발 모드).
    #[serde(default)]
    pub origins: Vec<String>,
}

/// 로그인 요청 제한 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// IP당 분당 로그인 시도 수
    pub login_requests_per_minute: u32,
    /// 비활성화 여부
    #[serde(default)]
    pub disabled: bool,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없어도 기본값과 환경 변수만으로 로드됩니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.trust_forwarded_headers", false)?
            .set_default("auth.profile", "dev")?
            .set_default("auth.issuer", "nearchrist")?
            .set_default("auth.token_ttl_minutes", 60)?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("cors.origins", Vec::<String>::new())?
            .set_default("rate_limit.login_requests_per_minute", 30)?
            .set_default("rate_limit.disabled", false)?
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("NEARCHRIST")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.origins")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 기본 경로(`config/default.toml`)에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }

    /// 로드된 설정의 일관성을 확인합니다.
    ///
    /// - 토큰 유효 기간은 양수이고 [`MAX_TOKEN_TTL_MINUTES`] 이하여야 합니다.
    /// - 운영 프로필은 [`MIN_SECRET_LEN`] 이상의 서명 키가 필요합니다.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.auth.token_ttl_minutes <= 0 {
            return Err(DirectoryError::Config(format!(
                "auth.token_ttl_minutes must be positive, got {}",
                self.auth.token_ttl_minutes
            )));
        }
        if self.auth.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            return Err(DirectoryError::Config(format!(
                "auth.token_ttl_minutes must be at most {}, got {}",
                MAX_TOKEN_TTL_MINUTES, self.auth.token_ttl_minutes
            )));
        }

        if self.auth.profile == DeploymentProfile::Prod {
            let len = self
                .auth
                .jwt_secret
                .as_ref()
                .map(|s| s.expose_secret().len())
                .unwrap_or(0);
            if len < MIN_SECRET_LEN {
                return Err(DirectoryError::Config(format!(
                    "auth.jwt_secret must be at least {} bytes in prod profile",
                    MIN_SECRET_LEN
                )));
            }
        }

        if self.auth.bootstrap_admin_email.is_some() != self.auth.bootstrap_admin_password.is_some()
        {
            return Err(DirectoryError::Config(
                "auth.bootstrap_admin_email and auth.bootstrap_admin_password must be set together"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// 개발용 기본 서명 키를 사용 중인지 여부.
    pub fn uses_fallback_secret(&self) -> bool {
        self.auth.jwt_secret.is_none()
    }
}
