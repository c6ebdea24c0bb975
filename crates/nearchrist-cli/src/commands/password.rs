//! 비밀번호 해싱.
//!
//! SQL 시드 행에 넣을 Argon2id PHC 문자열을 만듭니다.

use anyhow::{bail, Context, Result};
use nearchrist_api::auth::{hash_password, validate_password_strength};
use tracing::warn;

/// 평문 비밀번호를 해싱합니다.
///
/// `strict`이면 강도 검사에 실패할 때 에러를 반환하고, 아니면 경고만 남깁니다.
pub fn hash(password: &str, strict: bool) -> Result<String> {
    if password.is_empty() {
        bail!("password must not be empty");
    }

    if let Err(reason) = validate_password_strength(password) {
        if strict {
            bail!("weak password: {reason}");
        }
        warn!(reason, "Weak password accepted (use --strict to reject)");
    }

    hash_password(password).context("failed to hash password")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearchrist_api::auth::verify_password;

    #[test]
    fn test_hash_is_verifiable() {
        let phc = hash("admin123", false).unwrap();

        assert!(phc.starts_with("$argon2id$"));
        assert!(verify_password("admin123", &phc).is_ok());
        assert!(verify_password("admin124", &phc).is_err());
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(hash("", false).is_err());
    }
}
