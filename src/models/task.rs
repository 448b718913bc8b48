use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Cached assignee name of a task nobody owns.
pub const UNASSIGNED: &str = "unassigned";

fn unassigned_name() -> String {
    UNASSIGNED.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "super::timestamp")]
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub assigned_user: String, // "" means unassigned
    #[serde(default = "unassigned_name")]
    pub assigned_user_name: String,
    #[serde(with = "super::timestamp")]
    pub date_created: DateTime<Utc>,
}

impl Task {
    pub fn new(name: String, deadline: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description: String::new(),
            deadline,
            completed: false,
            assigned_user: String::new(),
            assigned_user_name: unassigned_name(),
            date_created: Utc::now(),
        }
    }

    pub fn is_assigned(&self) -> bool {
        !self.assigned_user.is_empty()
    }

    /// Whether this task belongs in `user_id`'s pending list.
    pub fn is_pending_for(&self, user_id: &str) -> bool {
        !self.completed && self.assigned_user == user_id
    }

    pub fn unassign(&mut self) {
        self.assigned_user.clear();
        self.assigned_user_name = unassigned_name();
    }
}
