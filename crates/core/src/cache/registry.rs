//! Registry-wide operations: creating, enumerating, matching across and
//! deleting partitions.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::partition::Partition;
use crate::Error;
use crate::exchange::{StoredResponse, WorkerRequest};

/// Size of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStats {
    pub name: String,
    pub entries: u64,
    pub bytes: u64,
}

impl CacheDb {
    /// Handle to a partition, without creating it.
    pub fn partition(&self, name: &str) -> Partition {
        Partition::new(self.clone(), name)
    }

    /// Create the partition if missing and return its handle.
    pub async fn open_partition(&self, name: &str) -> Result<Partition, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("partition name cannot be empty".into()));
        }

        let owned = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)", params![owned, now])?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(self.partition(name))
    }

    /// Names of all existing partitions, in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, rowid ASC")?;
                let names = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
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
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up across several partitions, returning the first hit.
    pub async fn match_in(&self, names: &[&str], request: &WorkerRequest) -> Result<Option<StoredResponse>, Error> {
        for name in names {
            if let Some(response) = self.partition(name).match_request(request).await? {
                tracing::debug!(partition = %name, url = %request.url, "cache hit");
                return Ok(Some(response));
            }
        }

        tracing::debug!(url = %request.url, "cache miss");
        Ok(None)
    }

    /// Entry count and stored body bytes for every partition.
    pub async fn partition_stats(&self) -> Result<Vec<PartitionStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, COUNT(e.key_hash), COALESCE(SUM(LENGTH(e.body)), 0)
                    FROM partitions p LEFT JOIN entries e ON e.partition = p.name
                    GROUP BY p.name
                    ORDER BY p.created_at ASC, p.rowid ASC",
                )?;

                let stats = stmt
                    .query_map([], |row| {
                        Ok(PartitionStats {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)? as u64,
                            bytes: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }

    /// Total stored body bytes across all partitions.
    pub async fn total_size(&self) -> Result<u64, Error> {
        Ok(self.partition_stats().await?.iter().map(|s| s.bytes).sum())
    }
}
