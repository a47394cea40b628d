//! Storage configuration types.

use serde::Deserialize;

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Memory,
    Redis,
    Mongodb,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StorageType::Memory => "memory",
            StorageType::Redis => "redis",
            StorageType::Mongodb => "mongodb",
        })
    }
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// In-process store configuration.
    pub memory: MemoryConfig,
    /// Redis-specific configuration.
    pub redis: RedisConfig,
    /// MongoDB-specific configuration.
    pub mongodb: MongodbConfig,
}

/// In-process store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// First identifier handed out, and the value `clear` resets to.
    pub initial_id: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { initial_id: 1 }
    }
}

/// Redis-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URI.
    pub uri: String,
    /// Prefix for every key the store writes.
    pub key_prefix: String,
    /// Seed for the identifier counter when it does not exist yet.
    pub initial_id: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            uri: "redis://localhost:6379".to_string(),
            key_prefix: "eventline".to_string(),
            initial_id: 1,
        }
    }
}

/// MongoDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongodbConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Collection holding one document per event.
    pub collection: String,
}

impl Default for MongodbConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "eventline".to_string(),
            collection: "events".to_string(),
        }
    }
}
