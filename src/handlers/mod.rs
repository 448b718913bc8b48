mod home;
mod payload;
mod task;
mod user;

pub use home::{api_home, not_found, service_info};
pub use payload::Payload;
pub use task::{create_task, delete_task, get_task, list_tasks, update_task};
pub use user::{create_user, delete_user, get_user, list_users, update_user};
