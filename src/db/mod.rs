pub mod json;
pub mod model;
pub mod repo;
pub mod sqlite;

pub use json::JsonStore;
pub use model::*;
pub use repo::*;
pub use sqlite::SqliteRepository;
