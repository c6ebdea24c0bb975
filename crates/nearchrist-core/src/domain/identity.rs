//! 인증된 사용자 신원과 역할.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 사용자 역할.
///
/// 역할 이름은 앞뒤 공백을 제거한 대문자로 정규화되며,
/// `ROLE_` 접두사는 제거됩니다 (`"role_admin"` → `ADMIN`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(from = "String", into = "String")]
#[cfg_attr(feature = "utoipa-support", schema(value_type = String, example = "ADMIN"))]
pub struct Role(String);

impl Role {
    /// 관리자 역할 이름.
    pub const ADMIN: &'static str = "ADMIN";
    /// 감독자 역할 이름.
    pub const SUPERVISOR: &'static str = "SUPERVISOR";
    /// 일반 사용자 역할 이름.
    pub const STANDARD: &'static str = "STANDARD";

    /// 시스템이 알고 있는 역할 목록.
    pub const KNOWN: [&'static str; 3] = [Self::ADMIN, Self::SUPERVISOR, Self::STANDARD];

    /// 역할 이름을 정규화하여 생성합니다.
    pub fn new(name: impl AsRef<str>) -> Self {
        let upper = name.as_ref().trim().to_uppercase();
        let bare = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        Self(bare.to_string())
    }

    /// 관리자 역할.
    pub fn admin() -> Self {
        Self(Self::ADMIN.to_string())
    }

    /// 역할 이름.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 시스템에 정의된 역할인지 확인합니다.
    pub fn is_known(&self) -> bool {
        Self::KNOWN.contains(&self.0.as_str())
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::new(value)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 인증된 사용자 신원.
///
/// 자격 증명 저장소에서 조회되거나 토큰에서 복원되며, 생성 후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
pub struct Identity {
    /// 사용자 ID
    pub id: i64,
    /// 표시 이름
    pub name: String,
    /// 이메일 (로그인 식별자)
    pub email: String,
    /// 역할 집합
    #[cfg_attr(feature = "utoipa-support", schema(value_type = Vec<String>))]
    pub roles: BTreeSet<Role>,
}

impl Identity {
    /// 새 신원을 생성합니다.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        email: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// 특정 역할을 가지는지 확인.
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// 관리자인지 확인.
    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::admin())
    }

    /// 역할 이름 목록 (정렬됨).
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }
}
