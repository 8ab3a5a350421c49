pub mod extract;
pub mod requests;

pub use extract::{TodoId, ValidJson};
pub use requests::{ChatRequest, CreateTodoRequest, NftRequest, UpdateTodoRequest, Validate};
