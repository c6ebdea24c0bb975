//! # NearChrist Core
//!
//! NearChrist 디렉터리 서비스의 핵심 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 API 서버와 CLI가 공유하는 기본 타입을 제공합니다:
//! - 인증된 사용자 신원(`Identity`) 및 역할(`Role`)
//! - 배포 프로필(`DeploymentProfile`)
//! - 디렉터리 레코드 (주, 교구, 본당, 성체조배, 묵주기도 십자군)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
