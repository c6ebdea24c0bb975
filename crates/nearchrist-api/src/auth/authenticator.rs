//! 로그인 처리.
//!
//! 식별자/비밀번호를 검증하고 액세스 토큰을 발급합니다. 세션은 저장하지 않습니다.

use nearchrist_core::Identity;
use std::sync::Arc;
use tracing::{info, warn};

use super::clock::Clock;
use super::password::burn_verification;
use super::token::{TokenCodec, TokenError};
use crate::metrics::record_login;
use crate::repository::{CredentialStore, StoreError};

/// 로그인 에러.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// 알 수 없는 식별자, 비밀번호 불일치, 비활성 계정 모두 같은 에러로 보고합니다.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// 저장소 장애
    #[error("자격 증명 저장소 에러: {0}")]
    Store(#[from] StoreError),
    /// 토큰 발급 실패
    #[error("토큰 발급 실패: {0}")]
    Token(#[from] TokenError),
    /// blocking 작업 실패
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 성공한 로그인 결과.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub access_token: String,
    /// 토큰 유효 기간 (초)
    pub expires_in: i64,
}

/// 인증기.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("store", &self.store.backend())
            .field("codec", &self.codec)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Authenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            codec,
            clock,
        }
    }

    /// 식별자/비밀번호로 로그인합니다.
    ///
    /// 저장소 조회 동안 어떤 잠금도 잡지 않으며, Argon2 검증은
    /// blocking 스레드 풀에서 실행됩니다.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<LoginOutcome, AuthError> {
        let found = self.store.find_by_identifier(identifier).await?;

        let Some(credential) = found else {
            burn(secret.to_owned()).await;
            record_login("unknown_identifier");
            warn!("Login failed: unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        let store = Arc::clone(&self.store);
        let secret = secret.to_owned();
        let hash = credential.password_hash;
        let matches = tokio::task::spawn_blocking(move || store.verify_secret(&hash, &secret))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !matches {
            record_login("bad_secret");
            warn!(user_id = credential.identity.id, "Login failed: secret mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if !credential.enabled {
            record_login("disabled");
            warn!(user_id = credential.identity.id, "Login failed: account disabled");
            return Err(AuthError::InvalidCredentials);
        }

        let identity = credential.identity;
        let access_token = self.codec.mint(&identity, self.clock.now())?;

        record_login("success");
        info!(user_id = identity.id, roles = ?identity.role_names(), "Login succeeded");

        Ok(LoginOutcome {
            identity,
            access_token,
            expires_in: self.codec.ttl().num_seconds(),
        })
    }
}

async fn burn(secret: String) {
    let _ = tokio::task::spawn_blocking(move || burn_verification(&secret)).await;
}
