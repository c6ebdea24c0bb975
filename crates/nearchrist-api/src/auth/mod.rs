//! 인증 및 권한 부여.
//!
//! Bearer 토큰 기반의 무상태 인증과 역할 기반 접근 제어를 제공합니다.
//!
//! # 구성 요소
//!
//! - [`TokenCodec`]: 액세스 토큰 발급/검증 (HS256)
//! - [`Authenticator`]: 식별자/비밀번호 로그인
//! - [`gatekeeper_middleware`]: 토큰을 [`ExecutionContext`]로 변환
//! - [`AccessPolicy`] / [`access_policy_middleware`]: 경로 규칙 평가
//! - [`CurrentUser`], [`MaybeUser`], [`AdminUser`]: 핸들러 추출기
//!
//! 미들웨어 순서는 게이트키퍼 → 접근 정책 → 핸들러입니다.

mod authenticator;
mod clock;
mod context;
mod extract;
mod gatekeeper;
mod password;
mod policy;
mod token;

pub use authenticator::{AuthError, Authenticator, LoginOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{ExecutionContext, TokenRejection};
pub use extract::{require_role, AdminUser, AuthRejection, CurrentUser, MaybeUser};
pub use gatekeeper::{extract_bearer, gatekeeper_middleware};
pub use password::{
    burn_verification, hash_password, validate_password_strength, verify_password, PasswordError,
};
pub use policy::{
    access_policy_middleware, is_secure_transport, AccessDecision, AccessPolicy, AccessRule,
    MethodMatcher, PathPattern, Requirement,
};
pub use token::{TokenClaims, TokenCodec, TokenError};
