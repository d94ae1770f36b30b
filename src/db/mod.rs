pub mod init;
pub mod models;
pub mod queries;
pub mod schema;
pub mod validate;

pub use init::{init_db, run_migrations, DbPool};
pub use models::*;
pub use queries::*;
