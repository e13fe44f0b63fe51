//! Partition naming and lifecycle operations.
//!
//! Every partition name carries the cache version as a suffix
//! (`static-v2`, `dynamic-v2`, `api-v2`). Bumping the version makes the old
//! partitions unknown, and activation deletes them.

use super::connection::CacheStorage;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Request class, which is also the partition a request is cached in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    /// Immutable build artifacts: scripts, stylesheets, images, fonts.
    Static,
    /// Backend calls.
    Api,
    /// Everything else.
    Dynamic,
}

impl RequestClass {
    pub const ALL: [RequestClass; 3] = [RequestClass::Static, RequestClass::Dynamic, RequestClass::Api];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestClass::Static => "static",
            RequestClass::Api => "api",
            RequestClass::Dynamic => "dynamic",
        }
    }
}

impl std::fmt::Display for RequestClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of partition names for one cache version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSet {
    version: String,
}

impl PartitionSet {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Versioned partition name for a class, e.g. `api-v2`.
    pub fn name(&self, class: RequestClass) -> String {
        format!("{}-{}", class.as_str(), self.version)
    }

    /// All current partition names.
    pub fn names(&self) -> Vec<String> {
        RequestClass::ALL.iter().map(|c| self.name(*c)).collect()
    }

    /// Class of a current partition name; `None` for stale or foreign names.
    pub fn class_of(&self, name: &str) -> Option<RequestClass> {
        RequestClass::ALL.into_iter().find(|c| self.name(*c) == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.class_of(name).is_some()
    }
}

impl CacheStorage {
    /// Create a partition if it does not exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all existing partitions, in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns whether the partition existed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names() {
        let set = PartitionSet::new("v2");
        assert_eq!(set.name(RequestClass::Static), "static-v2");
        assert_eq!(set.name(RequestClass::Api), "api-v2");
        assert_eq!(set.names(), vec!["static-v2", "dynamic-v2", "api-v2"]);
    }

    #[test]
    fn test_class_of() {
        let set = PartitionSet::new("v2");
        assert_eq!(set.class_of("dynamic-v2"), Some(RequestClass::Dynamic));
        assert_eq!(set.class_of("dynamic-v1"), None);
        assert!(!set.contains("old-v1"));
    }

    #[tokio::test]
    async fn test_open_partition_idempotent() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.open_partition("static-v2").await.unwrap();
        storage.open_partition("static-v2").await.unwrap();

        assert_eq!(storage.partition_names().await.unwrap(), vec!["static-v2"]);
    }

    #[tokio::test]
    async fn test_partition_names_creation_order() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        for name in ["old-v1", "static-v2", "api-v2"] {
            storage.open_partition(name).await.unwrap();
        }

        assert_eq!(storage.partition_names().await.unwrap(), vec!["old-v1", "static-v2", "api-v2"]);
    }

    #[tokio::test]
    async fn test_delete_partition() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        storage.open_partition("old-v1").await.unwrap();

        assert!(storage.delete_partition("old-v1").await.unwrap());
        assert!(!storage.delete_partition("old-v1").await.unwrap());
        assert!(storage.partition_names().await.unwrap().is_empty());
    }
}
