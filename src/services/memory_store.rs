use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use crate::errors::{StoreError, StoreResult};
use crate::models::{Task, User};
use super::store::EntityStore;

struct Collection<T> {
    records: HashMap<String, T>,
    order: Vec<String>, // insertion order, mirrors the sorted-set index in Redis
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Clone> Collection<T> {
    fn get(&self, id: &str) -> Option<T> {
        self.records.get(id).cloned()
    }

    fn list(&self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    fn put(&mut self, id: &str, record: T) {
        if self.records.insert(id.to_string(), record).is_none() {
            self.order.push(id.to_string());
        }
    }

    fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.records.remove(id);
        if removed.is_some() {
            self.order.retain(|known| known != id);
        }
        removed
    }
}

#[derive(Default)]
struct Inner {
    users: Collection<User>,
    tasks: Collection<Task>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: &str) -> bool {
        self.users
            .records
            .values()
            .any(|user| user.email == email && user.id != except)
    }
}

/// In-process store with the same contract as `RedisService`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(user_id))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.inner.read().await.users.list())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, &user.id) {
            return Err(StoreError::Duplicate("email"));
        }
        inner.users.put(&user.id, user.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, &user.id) {
            return Err(StoreError::Duplicate("email"));
        }
        inner.users.put(&user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        Ok(self.inner.write().await.users.remove(user_id).is_some())
    }

    async fn get_task(&self, task_id: &str) -> StoreResult<Option<Task>> {
        Ok(self.inner.read().await.tasks.get(task_id))
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(self.inner.read().await.tasks.list())
    }

    async fn save_task(&self, task: &Task) -> StoreResult<()> {
        self.inner.write().await.tasks.put(&task.id, task.clone());
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> StoreResult<bool> {
        Ok(self.inner.write().await.tasks.remove(task_id).is_some())
    }

    async fn unassign_open_tasks(&self, user_id: &str) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let mut count = 0;
        for task in inner.tasks.records.values_mut() {
            if task.is_pending_for(user_id) {
                task.unassign();
                count += 1;
            }
        }
        Ok(count)
    }
}
