use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Offer, Repository, Session, UnitOfWork, User, Wish};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    offers: Vec<Offer>,
    wishes: Vec<Wish>,
    fail_removal: bool,
    fail_commit: bool,
}

/// In-process store backing `AppState::fake()`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store poisoned")
    }

    pub fn seed_user(&self, user: User) {
        self.lock().users.push(user);
    }

    pub fn seed_offer(&self, offer: Offer) {
        self.lock().offers.push(offer);
    }

    pub fn seed_wish(&self, wish: Wish) {
        self.lock().wishes.push(wish);
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.lock().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn fail_removal(&self, fail: bool) {
        self.lock().fail_removal = fail;
    }

    pub fn fail_commit(&self, fail: bool) {
        self.lock().fail_commit = fail;
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.lock().users.clone())
    }

    async fn offers_by_owner(&self, owner_id: Uuid, active: bool) -> anyhow::Result<Vec<Offer>> {
        Ok(self
            .lock()
            .offers
            .iter()
            .filter(|o| o.owner_id == owner_id && o.is_active == active)
            .cloned()
            .collect())
    }

    async fn wishes_by_owner(&self, owner_id: Uuid, active: bool) -> anyhow::Result<Vec<Wish>> {
        Ok(self
            .lock()
            .wishes
            .iter()
            .filter(|w| w.owner_id == owner_id && w.is_active == active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn begin(&self) -> anyhow::Result<Box<dyn Session>> {
        Ok(Box::new(MemorySession {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }
}

enum Staged {
    Insert(User),
    Update(User),
    Remove(Uuid),
}

pub struct MemorySession {
    store: MemoryStore,
    staged: Vec<Staged>,
}

#[async_trait]
impl Session for MemorySession {
    async fn stage_insert(&mut self, user: &User) -> anyhow::Result<()> {
        let st = self.store.lock();
        anyhow::ensure!(
            !st.users.iter().any(|u| u.email == user.email),
            "duplicate email {}",
            user.email
        );
        drop(st);
        self.staged.push(Staged::Insert(user.clone()));
        Ok(())
    }

    async fn stage_update(&mut self, user: &User) -> anyhow::Result<bool> {
        let current = self.store.user(user.id);
        match current {
            Some(stored) if stored.version == user.version => {
                self.staged.push(Staged::Update(user.clone()));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn stage_removal(&mut self, user_id: Uuid) -> anyhow::Result<()> {
        anyhow::ensure!(!self.store.lock().fail_removal, "removal refused");
        self.staged.push(Staged::Remove(user_id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let mut st = self.store.lock();
        anyhow::ensure!(!st.fail_commit, "commit refused");
        for op in self.staged {
            match op {
                Staged::Insert(user) => st.users.push(user),
                Staged::Update(mut user) => {
                    if let Some(slot) = st.users.iter_mut().find(|u| u.id == user.id) {
                        user.version += 1;
                        *slot = user;
                    }
                }
                Staged::Remove(id) => {
                    st.users.retain(|u| u.id != id);
                    st.offers.retain(|o| o.owner_id != id);
                    st.wishes.retain(|w| w.owner_id != id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: "someone".into(),
            password_hash: "hash".into(),
            picture: "http://default".into(),
            picture_key: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            version: 0,
        }
    }

    #[tokio::test]
    async fn staged_writes_are_invisible_until_commit() {
        let store = MemoryStore::default();
        let u = user("a@example.com");
        let mut session = store.begin().await.unwrap();
        session.stage_insert(&u).await.unwrap();
        assert!(store.find_user(u.id).await.unwrap().is_none());
        session.commit().await.unwrap();
        assert!(store.find_user(u.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_with_stale_version_is_rejected() {
        let store = MemoryStore::default();
        let u = user("b@example.com");
        store.seed_user(u.clone());

        let mut first = store.begin().await.unwrap();
        assert!(first.stage_update(&u).await.unwrap());
        first.commit().await.unwrap();
        assert_eq!(store.user(u.id).unwrap().version, 1);

        let mut second = store.begin().await.unwrap();
        assert!(!second.stage_update(&u).await.unwrap());
    }

    #[tokio::test]
    async fn removal_cascades_to_ads() {
        let store = MemoryStore::default();
        let u = user("c@example.com");
        store.seed_user(u.clone());
        store.seed_offer(Offer {
            id: Uuid::new_v4(),
            owner_id: u.id,
            title: "bike".into(),
            description: None,
            picture: None,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        });

        let mut session = store.begin().await.unwrap();
        session.stage_removal(u.id).await.unwrap();
        session.commit().await.unwrap();

        assert_eq!(store.user_count(), 0);
        assert!(store.offers_by_owner(u.id, true).await.unwrap().is_empty());
    }
}
