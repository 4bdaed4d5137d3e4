pub mod schema;
pub mod storage;

pub use schema::{TaskCreate, TaskPatch, TaskPublic, TaskRow, ValidationError};
pub use storage::TaskStorage;
