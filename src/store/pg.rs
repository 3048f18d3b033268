use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Offer, Repository, Session, UnitOfWork, User, Wish};

const USER_COLUMNS: &str = "id, email, display_name, password_hash, picture, picture_key, \
                            created_at, updated_at, version";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for PgStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(users)
    }

    async fn offers_by_owner(&self, owner_id: Uuid, active: bool) -> anyhow::Result<Vec<Offer>> {
        let rows = sqlx::query_as::<_, Offer>(
            r#"
            SELECT id, owner_id, title, description, picture, is_active, created_at
              FROM offers
             WHERE owner_id = $1 AND is_active = $2
             ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(active)
        .fetch_all(&self.db)
        .await
        .context("list offers by owner")?;
        Ok(rows)
    }

    async fn wishes_by_owner(&self, owner_id: Uuid, active: bool) -> anyhow::Result<Vec<Wish>> {
        let rows = sqlx::query_as::<_, Wish>(
            r#"
            SELECT id, owner_id, title, description, picture, is_active, created_at
              FROM wishes
             WHERE owner_id = $1 AND is_active = $2
             ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(active)
        .fetch_all(&self.db)
        .await
        .context("list wishes by owner")?;
        Ok(rows)
    }
}

#[async_trait]
impl UnitOfWork for PgStore {
    async fn begin(&self) -> anyhow::Result<Box<dyn Session>> {
        let tx = self.db.begin().await.context("begin tx")?;
        Ok(Box::new(PgSession { tx }))
    }
}

pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Session for PgSession {
    async fn stage_insert(&mut self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, password_hash, picture, picture_key,
                               created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(&user.picture)
        .bind(user.picture_key.as_deref())
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.version)
        .execute(&mut *self.tx)
        .await
        .context("insert user")?;
        Ok(())
    }

    async fn stage_update(&mut self, user: &User) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET email = $2, display_name = $3, password_hash = $4, picture = $5,
                   picture_key = $6, updated_at = $7, version = version + 1
             WHERE id = $1 AND version = $8
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(&user.picture)
        .bind(user.picture_key.as_deref())
        .bind(user.updated_at)
        .bind(user.version)
        .execute(&mut *self.tx)
        .await
        .context("update user")?;
        Ok(res.rows_affected() == 1)
    }

    async fn stage_removal(&mut self, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .context("delete user")?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.tx.commit().await.context("commit tx")?;
        Ok(())
    }
}
