//! 액세스 토큰 발급/검증.
//!
//! 단일 대칭 키(HS256)로 서명한 JWT를 사용합니다. 서버에는 토큰 상태가 저장되지 않으며,
//! 토큰은 서명이 유효하고 `now < exp`인 동안만 유효합니다.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use nearchrist_core::{Identity, Role};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// JWT 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject - 사용자 ID
    pub sub: String,
    /// 표시 이름
    pub name: String,
    /// 이메일
    pub email: String,
    /// 역할 이름 목록
    pub roles: Vec<String>,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// 발급자
    pub iss: String,
}

impl TokenClaims {
    fn into_identity(self) -> Result<Identity, TokenError> {
        let id = self.sub.parse::<i64>().map_err(|_| TokenError::Malformed)?;
        Ok(Identity::new(
            id,
            self.name,
            self.email,
            self.roles.into_iter().map(Role::new),
        ))
    }
}

/// 토큰 처리 에러.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// 서명 불일치
    #[error("토큰 서명이 유효하지 않습니다")]
    BadSignature,
    /// 파싱 불가, 알고리즘/발급자 불일치
    #[error("잘못된 토큰 형식")]
    Malformed,
    /// 만료됨 (`now >= exp`)
    #[error("토큰이 만료되었습니다")]
    Expired,
    /// 인코딩 실패
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(String),
}

impl TokenError {
    /// 메트릭/로그용 사유 라벨.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::BadSignature => "bad_signature",
            TokenError::Malformed => "malformed",
            TokenError::Expired => "expired",
            TokenError::Encoding(_) => "encoding",
        }
    }
}

/// 토큰 코덱.
///
/// 시작 시 한 번 생성되어 모든 요청이 잠금 없이 공유합니다.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// 새 코덱 생성.
    ///
    /// # Arguments
    ///
    /// * `secret` - HS256 서명 키
    /// * `issuer` - `iss` 클레임 값
    /// * `ttl` - 토큰 유효 기간
    pub fn new(secret: &SecretString, issuer: impl Into<String>, ttl: Duration) -> Self {
        let issuer = issuer.into();
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        // 만료는 주입된 시각으로 직접 검사한다.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation,
            issuer,
            ttl,
        }
    }

    /// 토큰 유효 기간.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// 신원에 대한 토큰을 발급합니다.
    ///
    /// 같은 신원, 같은 시각, 같은 키에 대해 항상 같은 토큰을 생성합니다.
    pub fn mint(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = TokenClaims {
            sub: identity.id.to_string(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            roles: identity.role_names(),
            iat,
            exp: iat + self.ttl.num_seconds(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// 토큰을 검증하고 내장된 신원을 반환합니다.
    ///
    /// 자격 증명 저장소는 조회하지 않습니다.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let claims = self.decode_claims(token)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        claims.into_identity()
    }

    /// 서명과 형식만 확인하고 클레임을 반환합니다 (만료 검사 없음).
    pub fn decode_claims(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}
