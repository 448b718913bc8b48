//! Redis-backed document store.
//!
//! Key layout:
//! - `user:{id}` / `task:{id}` -> JSON document
//! - `users:index` / `tasks:index` -> ZSET of ids scored by creation millis
//! - `users:email` -> HASH email -> user id (unique index)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::de::DeserializeOwned;
use crate::errors::{StoreError, StoreResult};
use crate::models::{Task, User};
use super::store::EntityStore;

const USER_KEY_PREFIX: &str = "user:";
const TASK_KEY_PREFIX: &str = "task:";
const USERS_INDEX_KEY: &str = "users:index";
const TASKS_INDEX_KEY: &str = "tasks:index";
const USER_EMAIL_KEY: &str = "users:email";

const RELEASE_EMAIL_SCRIPT: &str = r"
if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
    return redis.call('HDEL', KEYS[1], ARGV[1])
end
return 0
";

fn user_key(user_id: &str) -> String {
    format!("{}{}", USER_KEY_PREFIX, user_id)
}

fn task_key(task_id: &str) -> String {
    format!("{}{}", TASK_KEY_PREFIX, task_id)
}

fn score(created: &DateTime<Utc>) -> f64 {
    created.timestamp_millis() as f64
}

#[derive(Clone)]
pub struct RedisService {
    conn: ConnectionManager,
}

impl RedisService {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to document store");
        Ok(Self { conn })
    }

    async fn get_document<T: DeserializeOwned>(&self, key: String) -> StoreResult<Option<T>> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(key).await?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    // Reads every document listed in an index, in index order. Ids whose
    // document vanished between the two reads are skipped.
    async fn list_documents<T: DeserializeOwned>(
        &self,
        index_key: &str,
        key_for: fn(&str) -> String,
    ) -> StoreResult<Vec<T>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.zrange(index_key, 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| key_for(id)).collect();
        let documents: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        documents
            .into_iter()
            .flatten()
            .map(|json| serde_json::from_str(&json).map_err(StoreError::from))
            .collect()
    }

    // Points `email` at `user_id` in the unique index. Returns true when the
    // entry was written by this call.
    async fn claim_email(&self, email: &str, user_id: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let claimed: bool = conn.hset_nx(USER_EMAIL_KEY, email, user_id).await?;
        if claimed {
            return Ok(true);
        }
        let owner: Option<String> = conn.hget(USER_EMAIL_KEY, email).await?;
        if owner.as_deref() == Some(user_id) {
            Ok(false)
        } else {
            Err(StoreError::Duplicate("email"))
        }
    }

    // Drops the index entry only while it still points at `user_id`.
    async fn release_email(&self, email: &str, user_id: &str) {
        let mut conn = self.conn.clone();
        let released = redis::Script::new(RELEASE_EMAIL_SCRIPT)
            .key(USER_EMAIL_KEY)
            .arg(email)
            .arg(user_id)
            .invoke_async::<_, i64>(&mut conn)
            .await;
        if let Err(e) = released {
            tracing::error!("Failed to release email claim of user {}: {}", user_id, e);
        }
    }

    // Runs a user write that follows an email claim. A failed write hands a
    // fresh claim back so the email stays usable.
    async fn write_claimed(
        &self,
        pipe: &redis::Pipeline,
        claim: Option<(&str, &str)>,
    ) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let written: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
        if let Err(e) = written {
            if let Some((email, user_id)) = claim {
                self.release_email(email, user_id).await;
            }
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for RedisService {
    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        self.get_document(user_key(user_id)).await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.list_documents(USERS_INDEX_KEY, user_key).await
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let document = serde_json::to_string(user)?;
        let fresh = self.claim_email(&user.email, &user.id).await?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(user_key(&user.id), document)
            .ignore()
            .zadd(USERS_INDEX_KEY, &user.id, score(&user.date_created))
            .ignore();
        self.write_claimed(&pipe, fresh.then_some((user.email.as_str(), user.id.as_str())))
            .await
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let document = serde_json::to_string(user)?;
        let previous: Option<User> = self.get_user(&user.id).await?;
        let (fresh, released_email) = match &previous {
            Some(prev) if prev.email != user.email => {
                (self.claim_email(&user.email, &user.id).await?, Some(prev.email.clone()))
            }
            Some(_) => (false, None),
            None => (self.claim_email(&user.email, &user.id).await?, None),
        };

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(user_key(&user.id), document)
            .ignore()
            .zadd(USERS_INDEX_KEY, &user.id, score(&user.date_created))
            .ignore();
        if let Some(email) = released_email {
            pipe.hdel(USER_EMAIL_KEY, email).ignore();
        }
        self.write_claimed(&pipe, fresh.then_some((user.email.as_str(), user.id.as_str())))
            .await
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<bool> {
        let Some(user) = self.get_user(user_id).await? else {
            return Ok(false);
        };

        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .del(user_key(user_id))
            .ignore()
            .zrem(USERS_INDEX_KEY, user_id)
            .ignore()
            .hdel(USER_EMAIL_KEY, &user.email)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(true)
    }

    async fn get_task(&self, task_id: &str) -> StoreResult<Option<Task>> {
        self.get_document(task_key(task_id)).await
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.list_documents(TASKS_INDEX_KEY, task_key).await
    }

    async fn save_task(&self, task: &Task) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .set(task_key(&task.id), serde_json::to_string(task)?)
            .ignore()
            .zadd(TASKS_INDEX_KEY, &task.id, score(&task.date_created))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let (removed, _): (usize, usize) = redis::pipe()
            .atomic()
            .del(task_key(task_id))
            .zrem(TASKS_INDEX_KEY, task_id)
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn unassign_open_tasks(&self, user_id: &str) -> StoreResult<usize> {
        let mut open: Vec<Task> = self
            .tasks_assigned_to(user_id)
            .await?
            .into_iter()
            .filter(|task| !task.completed)
            .collect();
        if open.is_empty() {
            return Ok(0);
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for task in open.iter_mut() {
            task.unassign();
            pipe.set(task_key(&task.id), serde_json::to_string(task)?).ignore();
        }

        let mut conn = self.conn.clone();
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(open.len())
    }
}
