//! 요청 단위 실행 컨텍스트.

use nearchrist_core::Identity;
use std::sync::Arc;

use super::token::TokenError;

/// 요청을 보낸 주체.
///
/// 게이트키퍼가 요청 extensions에 넣고, 접근 정책과 핸들러가 읽습니다.
#[derive(Debug, Clone, Default)]
pub enum ExecutionContext {
    #[default]
    Anonymous,
    Authenticated(Arc<Identity>),
}

impl ExecutionContext {
    pub fn identity(&self) -> Option<&Arc<Identity>> {
        match self {
            ExecutionContext::Authenticated(identity) => Some(identity),
            ExecutionContext::Anonymous => None,
        }
    }
}

/// 토큰이 제시되었지만 거부된 사유.
///
/// 권한 판단에는 쓰이지 않고, 401 응답의 에러 코드에만 반영됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRejection(pub TokenError);

impl TokenRejection {
    pub fn is_expired(&self) -> bool {
        self.0 == TokenError::Expired
    }
}
