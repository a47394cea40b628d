//! Storage implementations.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{StorageConfig, StorageType};

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use crate::interfaces::{EventStore, Result, StorageError};

pub use memory::MemoryEventStore;

#[cfg(feature = "redis")]
pub use redis::RedisEventStore;

#[cfg(feature = "mongodb")]
pub use mongodb::MongoEventStore;

/// Initialize storage based on configuration.
///
/// Returns the configured EventStore. Backends whose cargo feature is not
/// enabled fail here rather than at the first request.
pub async fn init_storage(
    config: &StorageConfig,
) -> std::result::Result<Arc<dyn EventStore>, Box<dyn std::error::Error>> {
    info!("Storage: {}", config.storage_type);

    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(MemoryEventStore::with_seed(
            config.memory.initial_id,
        ))),
        #[cfg(feature = "redis")]
        StorageType::Redis => {
            let store = RedisEventStore::with_initial_id(
                &config.redis.uri,
                Some(&config.redis.key_prefix),
                config.redis.initial_id,
            )
            .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        StorageType::Redis => {
            error!("Redis storage requested but 'redis' feature is not enabled");
            Err("Redis feature not enabled".into())
        }
        #[cfg(feature = "mongodb")]
        StorageType::Mongodb => {
            let client = ::mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
            let store = MongoEventStore::new(
                &client,
                &config.mongodb.database,
                &config.mongodb.collection,
            )
            .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongodb"))]
        StorageType::Mongodb => {
            error!("MongoDB storage requested but 'mongodb' feature is not enabled");
            Err("MongoDB feature not enabled".into())
        }
    }
}
