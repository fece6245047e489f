use std::{collections::HashMap, sync::RwLock};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::repo_types::User,
    error::UniqueViolation,
    store::{postgres::classify_write_error, UniqueKey},
};

const USER_COLUMNS: &str = "id, email, password_hash, name, role, bio, avatar_url, location, \
     website, linkedin, github, twitter, resume_url, created_at, updated_at";

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, user: User) -> anyhow::Result<User>;
    /// Persists every mutable field of `user`.
    async fn update(&self, user: User) -> anyhow::Result<User>;
}

/// Revoked token ids. Entries past their token's expiry may be pruned.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<()>;
    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool>;
}

pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn create(&self, user: User) -> anyhow::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(&user.location)
        .bind(&user.website)
        .bind(&user.linkedin)
        .bind(&user.github)
        .bind(&user.twitter)
        .bind(&user.resume_url)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| classify_write_error(e, "User", &[UniqueKey::Email]))
    }

    async fn update(&self, user: User) -> anyhow::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2, name = $3, bio = $4, avatar_url = $5, location = $6,
                website = $7, linkedin = $8, github = $9, twitter = $10, resume_url = $11,
                updated_at = $12
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(&user.location)
        .bind(&user.website)
        .bind(&user.linkedin)
        .bind(&user.github)
        .bind(&user.twitter)
        .bind(&user.resume_url)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await
        .context("update user")
    }
}

pub struct PgRevocations {
    db: PgPool,
}

impl PgRevocations {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RevocationStore for PgRevocations {
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("revoke token")?;
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < now()")
            .execute(&self.db)
            .await
            .context("prune revoked tokens")?;
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        let hit: Option<(Uuid,)> = sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.db)
            .await
            .context("check revoked token")?;
        Ok(hit.is_some())
    }
}

#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<Vec<User>>,
}

impl MemoryUserRepo {
    /// Test helper: simulates an account removed out of band.
    pub fn remove(&self, id: Uuid) {
        if let Ok(mut users) = self.users.write() {
            users.retain(|u| u.id != id);
        }
    }
}

fn poisoned() -> anyhow::Error {
    anyhow!("user store lock poisoned")
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: User) -> anyhow::Result<User> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(UniqueViolation {
                entity: "User",
                field: "email",
            }
            .into());
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> anyhow::Result<User> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| anyhow!("user {} not found", user.id))?;
        *slot = user.clone();
        Ok(user)
    }
}

#[derive(Default)]
pub struct MemoryRevocations {
    revoked: RwLock<HashMap<Uuid, OffsetDateTime>>,
}

#[async_trait]
impl RevocationStore for MemoryRevocations {
    async fn revoke(&self, jti: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<()> {
        let mut revoked = self
            .revoked
            .write()
            .map_err(|_| anyhow!("revocation lock poisoned"))?;
        let now = OffsetDateTime::now_utc();
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(jti, expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        let revoked = self
            .revoked
            .read()
            .map_err(|_| anyhow!("revocation lock poisoned"))?;
        Ok(revoked.contains_key(&jti))
    }
}
