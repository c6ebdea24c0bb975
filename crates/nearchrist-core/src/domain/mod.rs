//! 도메인 모델.

pub mod directory;
pub mod identity;
pub mod profile;

pub use directory::*;
pub use identity::*;
pub use profile::*;
