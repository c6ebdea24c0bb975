//! PostgreSQL 사용자 저장소.
//!
//! 테이블 구조:
//! - `users (user_id BIGSERIAL, user_name, user_email UNIQUE, password, enabled)`
//! - `roles (role_id BIGSERIAL, name UNIQUE)`
//! - `user_roles (user_id, role_id)`

use async_trait::async_trait;
use nearchrist_core::{Identity, Role};
use secrecy::SecretString;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::BTreeSet;
use tracing::debug;

use super::credentials::{
    CredentialStore, NewUser, StoreError, StoredCredential, UserChanges, UserRecord, UserStore,
};

const USER_COLUMNS: &str = r#"
    SELECT u.user_id, u.user_name, u.user_email, u.password, u.enabled,
           COALESCE(array_agg(r.name) FILTER (WHERE r.name IS NOT NULL), '{}') AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.user_id
    LEFT JOIN roles r ON r.role_id = ur.role_id
"#;

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: i64,
    user_name: String,
    user_email: String,
    password: String,
    enabled: bool,
    roles: Vec<String>,
}

impl UserRow {
    fn identity(&self) -> Identity {
        Identity::new(
            self.user_id,
            self.user_name.clone(),
            self.user_email.clone(),
            self.roles.iter().map(Role::new),
        )
    }

    fn record(&self) -> UserRecord {
        UserRecord::from_parts(&self.identity(), self.enabled)
    }
}

/// PostgreSQL 기반 사용자 저장소.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
        let sql = format!("{USER_COLUMNS} WHERE u.user_id = $1 GROUP BY u.user_id");
        Ok(sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn replace_roles(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        roles: &BTreeSet<Role>,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        for role in roles {
            sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(role.as_str())
                .execute(&mut **tx)
                .await?;
            sqlx::query(
                "INSERT INTO user_roles (user_id, role_id) \
                 SELECT $1, role_id FROM roles WHERE name = $2",
            )
            .bind(user_id)
            .bind(role.as_str())
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgUserStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<StoredCredential>, StoreError> {
        let sql = format!(
            "{USER_COLUMNS} WHERE lower(u.user_email) = lower($1) GROUP BY u.user_id"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(identifier.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| StoredCredential {
            identity: row.identity(),
            password_hash: SecretString::from(row.password),
            enabled: row.enabled,
        }))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let sql = format!("{USER_COLUMNS} GROUP BY u.user_id ORDER BY u.user_id");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(UserRow::record).collect())
    }

    async fn get_user(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.fetch_by_id(id).await?.as_ref().map(UserRow::record))
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (user_name, user_email, password, enabled) \
             VALUES ($1, $2, $3, $4) RETURNING user_id",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.enabled)
        .fetch_one(&mut *tx)
        .await?;

        Self::replace_roles(&mut tx, user_id, &user.roles).await?;
        tx.commit().await?;

        debug!(user_id, "User row created");
        Ok(UserRecord::from_parts(
            &Identity::new(user_id, user.name, user.email, user.roles),
            user.enabled,
        ))
    }

    async fn update_user(
        &self,
        id: i64,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE users SET \
               user_name = COALESCE($2, user_name), \
               user_email = COALESCE($3, user_email), \
               password = COALESCE($4, password), \
               enabled = COALESCE($5, enabled) \
             WHERE user_id = $1",
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.password_hash.as_deref())
        .bind(changes.enabled)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(roles) = &changes.roles {
            Self::replace_roles(&mut tx, id, roles).await?;
        }
        tx.commit().await?;

        Ok(self.fetch_by_id(id).await?.as_ref().map(UserRow::record))
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(deleted.rows_affected() > 0)
    }
}
