//! 인메모리 사용자 저장소.
//!
//! `database.url`이 설정되지 않았을 때 사용하는 기본 저장소입니다.

use async_trait::async_trait;
use nearchrist_core::Identity;
use secrecy::SecretString;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::credentials::{
    CredentialStore, NewUser, StoreError, StoredCredential, UserChanges, UserRecord, UserStore,
};

#[derive(Debug, Clone)]
struct StoredUser {
    identity: Identity,
    password_hash: String,
    enabled: bool,
}

impl StoredUser {
    fn record(&self) -> UserRecord {
        UserRecord::from_parts(&self.identity, self.enabled)
    }
}

#[derive(Debug, Default)]
struct UserTable {
    next_id: i64,
    users: BTreeMap<i64, StoredUser>,
}

impl UserTable {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.identity.id) != except && u.identity.email.eq_ignore_ascii_case(email))
    }

    fn insert(&mut self, user: NewUser) -> Result<UserRecord, StoreError> {
        if self.email_taken(&user.email, None) {
            return Err(StoreError::Conflict(format!("user email {}", user.email)));
        }

        self.next_id += 1;
        let stored = StoredUser {
            identity: Identity::new(self.next_id, user.name, user.email, user.roles),
            password_hash: user.password_hash,
            enabled: user.enabled,
        };
        let record = stored.record();
        self.users.insert(self.next_id, stored);
        Ok(record)
    }
}

/// 인메모리 사용자 저장소.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    table: RwLock<UserTable>,
}

impl InMemoryUserStore {
    /// 빈 저장소.
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 사용자 목록으로 생성합니다. ID는 1부터 순서대로 부여됩니다.
    pub fn with_users(users: impl IntoIterator<Item = NewUser>) -> Result<Self, StoreError> {
        let mut table = UserTable::default();
        for user in users {
            table.insert(user)?;
        }
        Ok(Self {
            table: RwLock::new(table),
        })
    }

    /// 등록된 사용자 수.
    pub async fn len(&self) -> usize {
        self.table.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for InMemoryUserStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredCredential>, StoreError> {
        let identifier = identifier.trim();
        let table = self.table.read().await;

        Ok(table
            .users
            .values()
            .find(|u| u.identity.email.eq_ignore_ascii_case(identifier))
            .map(|u| StoredCredential {
                identity: u.identity.clone(),
                password_hash: SecretString::from(u.password_hash.clone()),
                enabled: u.enabled,
            }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let table = self.table.read().await;
        Ok(table.users.values().map(StoredUser::record).collect())
    }

    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        let table = self.table.read().await;
        Ok(table.users.get(&id).map(StoredUser::record))
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        self.table.write().await.insert(user)
    }

    async fn update_user(
        &self,
        id: i64,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, StoreError> {
        let mut table = self.table.write().await;

        if let Some(email) = &changes.email {
            if table.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict(format!("user email {}", email)));
            }
        }

        let Some(user) = table.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            user.identity.name = name;
        }
        if let Some(email) = changes.email {
            user.identity.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(roles) = changes.roles {
            user.identity.roles = roles;
        }
        if let Some(enabled) = changes.enabled {
            user.enabled = enabled;
        }

        Ok(Some(user.record()))
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.table.write().await.users.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearchrist_core::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            roles: [Role::new("STANDARD")].into_iter().collect(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_find_is_case_insensitive() {
        let store = InMemoryUserStore::with_users([new_user("Admin@X.org")]).unwrap();

        let found = store.find_by_identifier(" admin@x.org ").await.unwrap();
        assert_eq!(found.map(|c| c.identity.id), Some(1));
        assert!(store.find_by_identifier("nobody@x.org").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = InMemoryUserStore::with_users([new_user("a@x.org")]).unwrap();

        let err = store.create_user(new_user("A@x.org")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = InMemoryUserStore::new();
        let created = store.create_user(new_user("a@x.org")).await.unwrap();
        assert_eq!(created.id, 1);

        let updated = store
            .update_user(
                created.id,
                UserChanges {
                    roles: Some([Role::admin()].into_iter().collect()),
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.roles.contains(&Role::admin()));
        assert!(!updated.enabled);

        assert!(store.update_user(42, UserChanges::default()).await.unwrap().is_none());
        assert!(store.delete_user(created.id).await.unwrap());
        assert!(!store.delete_user(created.id).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_email_to_taken_conflicts() {
        let store = InMemoryUserStore::with_users([new_user("a@x.org"), new_user("b@x.org")])
            .unwrap();

        let err = store
            .update_user(
                2,
                UserChanges {
                    email: Some("a@x.org".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
