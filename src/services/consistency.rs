//! Reconciliation between `Task.assignedUser`/`Task.completed` and
//! `User.pendingTasks`.
//!
//! The task side is authoritative; `pendingTasks` is a cache rebuilt from it.
//! Every mutation below writes the primary record first and then patches the
//! other side one store call at a time. Nothing is rolled back: if a
//! reconciliation write fails the primary write stands and the error is
//! logged and returned.

use std::collections::HashSet;
use crate::errors::{AppError, AppResult, StoreError, StoreResult};
use crate::models::{Task, TaskForm, User, UserForm, UNASSIGNED};
use super::store::EntityStore;

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

// Makes `user_id`'s pending list agree with `task` and returns the user, or
// `None` when the reference dangles.
async fn add_pending(store: &dyn EntityStore, user_id: &str, task: &Task) -> StoreResult<Option<User>> {
    let Some(mut user) = store.get_user(user_id).await? else {
        tracing::warn!("Task {} references missing user {}", task.id, user_id);
        return Ok(None);
    };

    let changed = if task.completed {
        user.remove_pending(&task.id)
    } else {
        user.add_pending(&task.id)
    };
    if changed {
        tracing::debug!("Pending tasks of user {} now {:?}", user.id, user.pending_tasks);
        store.save_user(&user).await?;
    }
    Ok(Some(user))
}

async fn remove_pending(store: &dyn EntityStore, user_id: &str, task_id: &str) -> StoreResult<()> {
    let Some(mut user) = store.get_user(user_id).await? else {
        return Ok(());
    };
    if user.remove_pending(task_id) {
        tracing::debug!("Removed task {} from pending tasks of user {}", task_id, user_id);
        store.save_user(&user).await?;
    }
    Ok(())
}

fn log_reconcile_failure(task_id: &str, err: &StoreError) {
    tracing::error!("Reconciliation for task {} failed after primary write: {}", task_id, err);
}

pub async fn create_task(store: &dyn EntityStore, form: TaskForm) -> AppResult<Task> {
    let (Some(name), Some(deadline)) = (form.name, form.deadline) else {
        return Err(AppError::validation("Fields 'name' and 'deadline' are required"));
    };

    let mut task = Task::new(name, deadline);
    task.description = form.description.unwrap_or_default();
    task.completed = form.completed.unwrap_or(false);
    task.assigned_user = form.assigned_user.unwrap_or_default();
    if task.is_assigned() {
        task.assigned_user_name = form.assigned_user_name.unwrap_or_default();
    }

    store.save_task(&task).await?;
    tracing::info!("Created task {}", task.id);

    if task.is_assigned() {
        let assignee = add_pending(store, &task.assigned_user, &task)
            .await
            .map_err(|e| {
                log_reconcile_failure(&task.id, &e);
                AppError::from(e)
            })?;

        if task.assigned_user_name.is_empty() {
            if let Some(user) = assignee {
                task.assigned_user_name = user.name;
                store.save_task(&task).await?;
            }
        }
    }

    Ok(task)
}

pub async fn update_task(store: &dyn EntityStore, task_id: &str, form: TaskForm) -> AppResult<Task> {
    let mut task = store.get_task(task_id).await?.ok_or_else(task_not_found)?;

    let previous_assignee = task.assigned_user.clone();
    let was_completed = task.completed;
    let name_overridden = form.assigned_user_name.as_deref().is_some_and(|n| !n.is_empty());

    if let Some(name) = form.name {
        task.name = name;
    }
    if let Some(description) = form.description {
        task.description = description;
    }
    if let Some(deadline) = form.deadline {
        task.deadline = deadline;
    }
    if let Some(completed) = form.completed {
        task.completed = completed;
    }
    if let Some(assignee) = form.assigned_user {
        task.assigned_user = assignee;
    }
    if let Some(assignee_name) = form.assigned_user_name {
        task.assigned_user_name = assignee_name;
    }

    store.save_task(&task).await?;
    tracing::info!("Updated task {}", task.id);

    let reconciled =
        reconcile_updated_task(store, &mut task, &previous_assignee, was_completed, name_overridden).await;
    if let Err(e) = reconciled {
        log_reconcile_failure(&task.id, &e);
        return Err(e.into());
    }

    Ok(task)
}

async fn reconcile_updated_task(
    store: &dyn EntityStore,
    task: &mut Task,
    previous_assignee: &str,
    was_completed: bool,
    name_overridden: bool,
) -> StoreResult<()> {
    if !previous_assignee.is_empty() && previous_assignee != task.assigned_user {
        remove_pending(store, previous_assignee, &task.id).await?;
    }

    if task.is_assigned() {
        let assignee = task.assigned_user.clone();
        if let Some(user) = add_pending(store, &assignee, task).await? {
            if !name_overridden && task.assigned_user_name != user.name {
                task.assigned_user_name = user.name;
                store.save_task(task).await?;
            }
        }
    } else if task.assigned_user_name != UNASSIGNED {
        task.assigned_user_name = UNASSIGNED.to_string();
        store.save_task(task).await?;
    }

    // A completed task is never pending, whatever the assignment step did.
    if !was_completed && task.completed && task.is_assigned() {
        remove_pending(store, &task.assigned_user, &task.id).await?;
    }
    Ok(())
}

pub async fn delete_task(store: &dyn EntityStore, task_id: &str) -> AppResult<()> {
    let task = store.get_task(task_id).await?.ok_or_else(task_not_found)?;
    let assignee = task.assigned_user;

    store.delete_task(task_id).await?;
    tracing::info!("Deleted task {}", task_id);

    if !assignee.is_empty() {
        remove_pending(store, &assignee, task_id).await.map_err(|e| {
            log_reconcile_failure(task_id, &e);
            AppError::from(e)
        })?;
    }
    Ok(())
}

pub async fn create_user(store: &dyn EntityStore, form: UserForm) -> AppResult<User> {
    let (Some(name), Some(email)) = (form.name, form.email) else {
        return Err(AppError::validation("Fields 'name' and 'email' are required"));
    };

    let mut user = User::new(name, email);
    store.insert_user(&user).await?;
    tracing::info!("Created user {}", user.id);

    if let Some(task_ids) = form.pending_tasks {
        sync_pending_tasks(store, &mut user, &task_ids).await?;
        store.save_user(&user).await?;
    }
    Ok(user)
}

pub async fn update_user(store: &dyn EntityStore, user_id: &str, form: UserForm) -> AppResult<User> {
    let mut user = store.get_user(user_id).await?.ok_or_else(user_not_found)?;
    let previous_name = user.name.clone();

    if let Some(name) = form.name {
        user.name = name;
    }
    if let Some(email) = form.email {
        user.email = email;
    }

    // Persist name/email first so an email conflict leaves every task untouched.
    store.save_user(&user).await?;
    tracing::info!("Updated user {}", user.id);

    if user.name != previous_name {
        rename_assignee(store, &user, &previous_name).await?;
    }

    if let Some(task_ids) = form.pending_tasks {
        sync_pending_tasks(store, &mut user, &task_ids).await?;
        store.save_user(&user).await?;
    }
    Ok(user)
}

// Tasks still carrying the old cached name follow the rename; explicit
// overrides are left alone.
async fn rename_assignee(store: &dyn EntityStore, user: &User, previous_name: &str) -> StoreResult<()> {
    for mut task in store.tasks_assigned_to(&user.id).await? {
        if task.assigned_user_name == previous_name {
            task.assigned_user_name = user.name.clone();
            store.save_task(&task).await?;
        }
    }
    Ok(())
}

/// Makes `task_ids` the user's pending list.
///
/// Tasks currently assigned to the user but absent from the list are
/// unassigned, completed or not. Every listed task that exists is assigned to
/// the user, silently taking it from any previous assignee. The resulting
/// pending list keeps only listed tasks that exist and are still open.
pub async fn sync_pending_tasks(store: &dyn EntityStore, user: &mut User, task_ids: &[String]) -> StoreResult<()> {
    let wanted: HashSet<&str> = task_ids.iter().map(String::as_str).collect();

    for mut task in store.tasks_assigned_to(&user.id).await? {
        if !wanted.contains(task.id.as_str()) {
            task.unassign();
            store.save_task(&task).await?;
            tracing::debug!("Unassigned task {} from user {}", task.id, user.id);
        }
    }

    let mut pending = Vec::with_capacity(task_ids.len());
    for task_id in task_ids {
        let Some(mut task) = store.get_task(task_id).await? else {
            tracing::warn!("Ignoring unknown task {} in pending list of user {}", task_id, user.id);
            continue;
        };

        if task.assigned_user != user.id || task.assigned_user_name != user.name {
            if task.is_assigned() && task.assigned_user != user.id {
                tracing::debug!("Task {} taken from user {} by user {}", task.id, task.assigned_user, user.id);
            }
            task.assigned_user = user.id.clone();
            task.assigned_user_name = user.name.clone();
            store.save_task(&task).await?;
        }
        if !task.completed {
            pending.push(task.id);
        }
    }

    user.pending_tasks = pending;
    Ok(())
}

pub async fn delete_user(store: &dyn EntityStore, user_id: &str) -> AppResult<()> {
    let user = store.get_user(user_id).await?.ok_or_else(user_not_found)?;

    let released = store.unassign_open_tasks(&user.id).await?;
    tracing::debug!("Unassigned {} open tasks of user {}", released, user.id);

    store.delete_user(&user.id).await?;
    tracing::info!("Deleted user {}", user.id);
    Ok(())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepairReport {
    pub users_checked: usize,
    pub users_repaired: usize,
}

/// Rebuilds every user's pending list from the task records.
///
/// Idempotent: users whose list already holds exactly their open tasks are
/// not written. Surviving entries keep their order; missing ones are
/// appended in task creation order.
pub async fn rebuild_pending(store: &dyn EntityStore) -> StoreResult<RepairReport> {
    let tasks = store.list_tasks().await?;
    let users = store.list_users().await?;
    let mut report = RepairReport::default();

    for mut user in users {
        report.users_checked += 1;

        let open: Vec<&str> = tasks
            .iter()
            .filter(|task| task.is_pending_for(&user.id))
            .map(|task| task.id.as_str())
            .collect();
        let open_set: HashSet<&str> = open.iter().copied().collect();

        let mut seen: HashSet<&str> = HashSet::with_capacity(open.len());
        let mut rebuilt: Vec<String> = Vec::with_capacity(open.len());
        for id in user.pending_tasks.iter().map(String::as_str).chain(open.iter().copied()) {
            if open_set.contains(id) && seen.insert(id) {
                rebuilt.push(id.to_string());
            }
        }

        if rebuilt != user.pending_tasks {
            tracing::info!("Repaired pending tasks of user {}", user.id);
            user.pending_tasks = rebuilt;
            store.save_user(&user).await?;
            report.users_repaired += 1;
        }
    }
    Ok(report)
}
