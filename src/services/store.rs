//! Entity store adapter.
//!
//! Every reference between users and tasks is a soft reference: lookups
//! return `None` for a missing record and callers decide what that means.

use async_trait::async_trait;
use crate::errors::StoreResult;
use crate::models::{Task, User};

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>>;

    /// All users in creation order.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Fails with `StoreError::Duplicate("email")` when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Overwrites an existing user, re-checking email uniqueness if it changed.
    async fn save_user(&self, user: &User) -> StoreResult<()>;

    /// Returns false when there was nothing to delete.
    async fn delete_user(&self, user_id: &str) -> StoreResult<bool>;

    async fn get_task(&self, task_id: &str) -> StoreResult<Option<Task>>;

    /// All tasks in creation order.
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;

    /// Insert or overwrite.
    async fn save_task(&self, task: &Task) -> StoreResult<()>;

    async fn delete_task(&self, task_id: &str) -> StoreResult<bool>;

    /// Tasks whose `assignedUser` is `user_id`, completed or not.
    async fn tasks_assigned_to(&self, user_id: &str) -> StoreResult<Vec<Task>> {
        let tasks = self.list_tasks().await?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.assigned_user == user_id)
            .collect())
    }

    /// Unassigns every open task of `user_id` in one pass and returns how
    /// many were touched. Completed tasks keep their assignee.
    async fn unassign_open_tasks(&self, user_id: &str) -> StoreResult<usize> {
        let mut count = 0;
        for mut task in self.tasks_assigned_to(user_id).await? {
            if task.completed {
                continue;
            }
            task.unassign();
            self.save_task(&task).await?;
            count += 1;
        }
        Ok(count)
    }
}
