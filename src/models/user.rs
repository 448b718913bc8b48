use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub pending_tasks: Vec<String>, // Derived cache of open task ids, duplicate free
    #[serde(with = "super::timestamp")]
    pub date_created: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            pending_tasks: Vec::new(),
            date_created: Utc::now(),
        }
    }

    pub fn has_pending(&self, task_id: &str) -> bool {
        self.pending_tasks.iter().any(|t| t == task_id)
    }

    /// Returns true when the list changed.
    pub fn add_pending(&mut self, task_id: &str) -> bool {
        if self.has_pending(task_id) {
            return false;
        }
        self.pending_tasks.push(task_id.to_string());
        true
    }

    /// Returns true when the list changed.
    pub fn remove_pending(&mut self, task_id: &str) -> bool {
        let before = self.pending_tasks.len();
        self.pending_tasks.retain(|t| t != task_id);
        self.pending_tasks.len() != before
    }
}
