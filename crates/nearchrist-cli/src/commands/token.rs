//! 토큰 발급/검사.
//!
//! 서버와 같은 설정(서명 키, 발급자, 유효 기간)으로 코덱을 만들기 때문에
//! 여기서 발급한 토큰은 실행 중인 게이트웨이에서 그대로 통용됩니다.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use nearchrist_api::auth::{TokenCodec, TokenError};
use nearchrist_core::{AppConfig, Identity, Role};
use serde_json::json;
use std::path::Path;
use tracing::warn;

/// 설정 파일과 환경 변수에서 코덱을 만듭니다.
pub fn load_codec(config_path: &Path) -> Result<TokenCodec> {
    let config = AppConfig::load(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate().context("invalid configuration")?;

    if config.uses_fallback_secret() {
        warn!("auth.jwt_secret not set, using development fallback (INSECURE)");
    }

    Ok(TokenCodec::new(
        &config.auth.signing_secret(),
        config.auth.issuer.clone(),
        config.auth.token_ttl(),
    ))
}

/// 발급할 토큰의 주체.
#[derive(Debug)]
pub struct IssueRequest {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl IssueRequest {
    fn into_identity(self) -> Result<Identity> {
        if self.email.trim().is_empty() {
            bail!("email must not be empty");
        }

        let roles: Vec<Role> = self.roles.iter().map(Role::new).collect();
        if let Some(unknown) = roles.iter().find(|r| !r.is_known()) {
            bail!(
                "unknown role: {} (known: {})",
                unknown,
                Role::KNOWN.join(", ")
            );
        }

        Ok(Identity::new(self.id, self.name, self.email, roles))
    }
}

/// 토큰을 발급합니다.
pub fn issue(codec: &TokenCodec, request: IssueRequest, now: DateTime<Utc>) -> Result<String> {
    let identity = request.into_identity()?;
    codec
        .mint(&identity, now)
        .context("failed to mint token")
}

/// 토큰 검사 결과를 JSON으로 만듭니다.
///
/// 검증에 실패해도 에러가 아니라 사유가 담긴 결과를 돌려줍니다.
pub fn inspect(codec: &TokenCodec, token: &str, now: DateTime<Utc>) -> (bool, serde_json::Value) {
    match codec.verify(token.trim(), now) {
        Ok(identity) => (true, json!({ "valid": true, "identity": identity })),
        Err(e) => (false, rejection_json(&e)),
    }
}

fn rejection_json(error: &TokenError) -> serde_json::Value {
    json!({
        "valid": false,
        "reason": error.reason(),
        "message": error.to_string(),
    })
}
