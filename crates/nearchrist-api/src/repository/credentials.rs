//! 자격 증명 저장소 인터페이스.
//!
//! 인증기는 [`CredentialStore`]만 알고 있으며, 구현은 인메모리
//! ([`super::InMemoryUserStore`]) 또는 PostgreSQL ([`super::PgUserStore`])입니다.

use async_trait::async_trait;
use nearchrist_core::{Identity, Role};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

use crate::auth::{hash_password, verify_password, PasswordError};

/// 저장된 자격 증명.
///
/// 해시는 로그나 응답에 노출되지 않도록 [`SecretString`]으로 보관합니다.
#[derive(Debug)]
pub struct StoredCredential {
    pub identity: Identity,
    pub password_hash: SecretString,
    pub enabled: bool,
}

/// 저장소 에러.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("저장소를 사용할 수 없습니다: {0}")]
    Unavailable(String),
    #[error("쿼리 실패: {0}")]
    Query(String),
    #[error("이미 존재합니다: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// 로그인 식별자로 자격 증명을 조회하는 저장소.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 식별자(이메일)로 자격 증명을 조회합니다. 대소문자를 구분하지 않습니다.
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredCredential>, StoreError>;

    /// 저장된 해시와 평문 비밀번호를 비교합니다.
    ///
    /// CPU 집약적이므로 blocking 스레드에서 호출해야 합니다.
    /// 해시 형식이 잘못된 경우에도 `false`를 반환합니다.
    fn verify_secret(&self, stored_hash: &SecretString, secret: &str) -> bool {
        verify_password(secret, stored_hash.expose_secret()).is_ok()
    }

    /// 헬스 체크에 표시할 저장소 종류.
    fn backend(&self) -> &'static str;
}

/// 사용자 관리 응답 DTO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub user_name: String,
    pub user_email: String,
    pub enabled: bool,
    #[schema(value_type = Vec<String>)]
    pub roles: BTreeSet<Role>,
}

impl UserRecord {
    pub fn from_parts(identity: &Identity, enabled: bool) -> Self {
        Self {
            id: identity.id,
            user_name: identity.name.clone(),
            user_email: identity.email.clone(),
            enabled,
            roles: identity.roles.clone(),
        }
    }
}

/// 새 사용자 (이미 해싱된 비밀번호).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<Role>,
    pub enabled: bool,
}

impl NewUser {
    /// 평문 비밀번호를 해싱하여 생성합니다.
    pub fn with_password(
        name: impl Into<String>,
        email: impl Into<String>,
        password: &str,
        roles: impl IntoIterator<Item = Role>,
    ) -> Result<Self, PasswordError> {
        Ok(Self {
            name: name.into(),
            email: email.into(),
            password_hash: hash_password(password)?,
            roles: roles.into_iter().collect(),
            enabled: true,
        })
    }
}

/// 사용자 수정 내용. `None`인 필드는 유지됩니다.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub roles: Option<BTreeSet<Role>>,
    pub enabled: Option<bool>,
}

/// 사용자 관리가 가능한 자격 증명 저장소.
#[async_trait]
pub trait UserStore: CredentialStore {
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;

    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, StoreError>;

    /// 이메일이 중복되면 [`StoreError::Conflict`].
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// 대상이 없으면 `Ok(None)`.
    async fn update_user(
        &self,
        id: i64,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// 삭제되었으면 `true`.
    async fn delete_user(&self, id: i64) -> Result<bool, StoreError>;
}
