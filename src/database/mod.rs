pub mod manager;
pub mod models;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use models::{Todo, TodoChanges};
pub use repository::{SqliteTodoStore, StoreError, TodoStore};
