pub mod todo;

pub use todo::{Todo, TodoChanges, TodoRow};
