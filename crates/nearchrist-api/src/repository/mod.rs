//! 저장소 계층.
//!
//! - [`CredentialStore`] / [`UserStore`]: 사용자 자격 증명 및 관리
//! - [`DirectoryRepository`]: 디렉터리 레코드

mod credentials;
mod directory;
mod postgres;
mod users;

pub use credentials::{
    CredentialStore, NewUser, StoreError, StoredCredential, UserChanges, UserRecord, UserStore,
};
pub use directory::DirectoryRepository;
pub use postgres::PgUserStore;
pub use users::InMemoryUserStore;
