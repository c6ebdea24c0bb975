//! 디렉터리 서비스의 에러 타입.

use thiserror::Error;

/// 핵심 디렉터리 에러.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필수 필드 누락 또는 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 레코드를 찾을 수 없음
    #[error("{kind}을(를) 찾을 수 없음: {id}")]
    NotFound { kind: &'static str, id: i64 },

    /// 중복 레코드
    #[error("중복: {0}")]
    Conflict(String),

    /// 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 디렉터리 작업을 위한 Result 타입.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl DirectoryError {
    /// 클라이언트 입력이 원인인 에러인지 확인합니다.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DirectoryError::InvalidInput(_)
                | DirectoryError::NotFound { .. }
                | DirectoryError::Conflict(_)
        )
    }

    /// API 응답에 사용할 에러 코드.
    pub fn code(&self) -> &'static str {
        match self {
            DirectoryError::Config(_) => "CONFIG_ERROR",
            DirectoryError::InvalidInput(_) => "INVALID_INPUT",
            DirectoryError::NotFound { .. } => "NOT_FOUND",
            DirectoryError::Conflict(_) => "CONFLICT",
            DirectoryError::Storage(_) => "STORAGE_ERROR",
            DirectoryError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for DirectoryError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        DirectoryError::InvalidInput(format!("필수 필드 누락: {}", fields.join(", ")))
    }
}

impl From<config::ConfigError> for DirectoryError {
    fn from(err: config::ConfigError) -> Self {
        DirectoryError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(DirectoryError::InvalidInput("stateName".into()).is_client_error());
        assert!(DirectoryError::NotFound { kind: "state", id: 1 }.is_client_error());
        assert!(!DirectoryError::Storage("pool closed".into()).is_client_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DirectoryError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(
            DirectoryError::NotFound { kind: "parish", id: 9 }.code(),
            "NOT_FOUND"
        );
    }
}
