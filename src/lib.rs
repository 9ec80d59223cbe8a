// TodoStore - In-memory to-do tasks with filtered, searched and sorted views

pub mod filter;
pub mod models;
pub mod query;
pub mod record;
pub mod session;
pub mod store;

// Re-export main types for convenience
pub use filter::{Filter, FilterOp};
pub use models::{NewTask, Priority, Task, TaskId, TaskUpdate};
pub use query::{StatusFilter, ViewQuery};
pub use record::{IndexValue, Record};
pub use session::{Command, Session, SessionConfig};
pub use store::{Stats, TaskStore};
