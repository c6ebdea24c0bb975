//! 핸들러용 주체 추출기.
//!
//! 게이트키퍼가 요청 extensions에 넣은 [`ExecutionContext`]를 읽습니다.
//! 토큰을 다시 검증하지 않습니다.
//!
//! ```rust,ignore
//! async fn me(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
//!     Json(identity.email.clone())
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use nearchrist_core::{Identity, Role};
use std::sync::Arc;

use super::context::{ExecutionContext, TokenRejection};
use crate::error::ApiErrorResponse;

/// 추출기 에러.
#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Access token has expired")]
    TokenExpired,
    #[error("Insufficient role for this operation")]
    InsufficientRole,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthRejection::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AuthRejection::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AuthRejection::InsufficientRole => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        };

        (status, Json(ApiErrorResponse::new(code, self.to_string()))).into_response()
    }
}

fn context_of(parts: &Parts) -> ExecutionContext {
    parts
        .extensions
        .get::<ExecutionContext>()
        .cloned()
        .unwrap_or_default()
}

/// 인증된 주체 추출기.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Arc<Identity>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match context_of(parts) {
            ExecutionContext::Authenticated(identity) => Ok(CurrentUser(identity)),
            ExecutionContext::Anonymous => {
                let expired = parts
                    .extensions
                    .get::<TokenRejection>()
                    .is_some_and(TokenRejection::is_expired);
                Err(if expired {
                    AuthRejection::TokenExpired
                } else {
                    AuthRejection::Unauthenticated
                })
            }
        }
    }
}

/// 선택적 주체 추출기. 익명이면 `None`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Arc<Identity>>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(context_of(parts).identity().cloned()))
    }
}

/// ADMIN 역할을 요구하는 추출기.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Arc<Identity>);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        require_role(&Role::admin(), &identity)?;
        Ok(AdminUser(identity))
    }
}

/// 주체가 역할을 가지고 있는지 확인합니다.
pub fn require_role(role: &Role, identity: &Identity) -> Result<(), AuthRejection> {
    if identity.has_role(role) {
        Ok(())
    } else {
        Err(AuthRejection::InsufficientRole)
    }
}
