mod user;
mod task;
mod envelope;
pub mod forms;
pub mod timestamp;

pub use user::User;
pub use task::{Task, UNASSIGNED};
pub use envelope::{Envelope, no_content};
pub use forms::{TaskForm, UserForm};
