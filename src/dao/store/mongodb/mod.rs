mod config;
mod error;
mod models;
pub mod store;

pub use config::{MongoConfig, PingRetry};
pub use error::MongoDaoError;
pub use store::MongoStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicateKey { field } => StorageError::conflict(match field {
                "email" => "Email already registered",
                "username" => "Username already taken",
                _ => "Google account already linked",
            }),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
