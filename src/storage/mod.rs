pub mod cached;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;

mod rows;

pub use cached::CachedStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{
    FactQuery, FactStore, Join, ReportStore, Storage, StorageError, StorageResult,
};
