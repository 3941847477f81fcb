pub mod sqlite;
pub mod traits;
pub mod transaction;
