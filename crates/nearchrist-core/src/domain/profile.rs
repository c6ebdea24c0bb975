//! 배포 프로필.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 배포 프로필.
///
/// 두 프로필은 같은 접근 규칙을 사용하며, `Prod`는 모든 요청에 HTTPS를 요구합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentProfile {
    /// 개발 (평문 HTTP 허용)
    #[default]
    #[serde(alias = "development", alias = "DEV")]
    Dev,
    /// 운영 (HTTPS 필수)
    #[serde(alias = "production", alias = "PROD")]
    Prod,
}

impl DeploymentProfile {
    /// 보안 전송(HTTPS)을 요구하는지 여부.
    pub fn requires_secure_transport(&self) -> bool {
        matches!(self, DeploymentProfile::Prod)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentProfile::Dev => "dev",
            DeploymentProfile::Prod => "prod",
        }
    }
}

impl FromStr for DeploymentProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Dev),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(format!("Unknown deployment profile: {}", other)),
        }
    }
}

impl fmt::Display for DeploymentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
