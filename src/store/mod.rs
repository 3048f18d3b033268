//! Persistence seams used by the user handlers.
//!
//! Reads go through [`Repository`]. Writes are staged on a [`Session`] obtained
//! from a [`UnitOfWork`] and only become visible on [`Session::commit`].

use async_trait::async_trait;
use uuid::Uuid;

pub mod models;
pub mod pg;

#[cfg(test)]
pub mod memory;

pub use models::{Offer, User, Wish};

#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
    async fn offers_by_owner(&self, owner_id: Uuid, active: bool) -> anyhow::Result<Vec<Offer>>;
    async fn wishes_by_owner(&self, owner_id: Uuid, active: bool) -> anyhow::Result<Vec<Wish>>;
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> anyhow::Result<Box<dyn Session>>;
}

#[async_trait]
pub trait Session: Send {
    async fn stage_insert(&mut self, user: &User) -> anyhow::Result<()>;

    /// Stages an update guarded by `user.version`.
    ///
    /// Returns `false` when the stored version no longer matches, in which
    /// case nothing was staged.
    async fn stage_update(&mut self, user: &User) -> anyhow::Result<bool>;

    async fn stage_removal(&mut self, user_id: Uuid) -> anyhow::Result<()>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}
