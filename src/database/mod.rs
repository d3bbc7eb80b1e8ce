pub mod list;
pub mod manager;
pub mod models;
pub mod scope;
pub mod visibility;

pub use manager::{DatabaseError, DatabaseManager};
pub use scope::CompanyScope;
