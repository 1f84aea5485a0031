//! Partition handles: match, put and enumerate entries of one named cache.

use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use crate::exchange::{StoredResponse, WorkerRequest};

/// Identity of a stored entry, as listed by [`Partition::keys`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryKey {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub inserted_at: String,
}

/// A row ready to be written, built on the caller's side so the closure sent
/// to the connection thread owns all of its data.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Bytes,
}

impl EntryRow {
    fn new(request: &WorkerRequest, response: &StoredResponse) -> Result<Self, Error> {
        if !response.is_success() {
            return Err(Error::Uncacheable(response.status.as_u16()));
        }

        let url = request.cache_url();
        Ok(Self {
            key_hash: compute_request_key(request.method.as_str(), &url),
            method: request.method.as_str().to_string(),
            url,
            status: response.status.as_u16(),
            headers_json: response.headers_json()?,
            body: response.body.clone(),
        })
    }
}

/// Handle to a named partition.
///
/// Obtaining a handle does not create the partition; it is created by
/// [`CacheDb::open_partition`] or lazily by the first successful write.
#[derive(Clone, Debug)]
pub struct Partition {
    db: CacheDb,
    name: String,
}

impl Partition {
    pub(crate) fn new(db: CacheDb, name: impl Into<String>) -> Self {
        Self { db, name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the stored response for a request.
    ///
    /// Returns None if the partition or the entry doesn't exist.
    pub async fn match_request(&self, request: &WorkerRequest) -> Result<Option<StoredResponse>, Error> {
        let key_hash = compute_request_key(request.method.as_str(), &request.cache_url());
        let name = self.name.clone();

        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<(u16, String, Vec<u8>)>, Error> {
                let mut stmt =
                    conn.prepare("SELECT status, headers_json, body FROM entries WHERE partition = ?1 AND key_hash = ?2")?;

                let result = stmt.query_row(params![name, key_hash], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)));

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((status, headers_json, body)) = row else {
            return Ok(None);
        };

        let status = StatusCode::from_u16(status).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let headers = StoredResponse::headers_from_json(&headers_json)?;

        Ok(Some(StoredResponse::new(status, headers, body)))
    }

    /// Store a response for a request, replacing any previous entry.
    ///
    /// Creates the partition if it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns `Error::Uncacheable` if the response status is outside 2xx.
    pub async fn put(&self, request: &WorkerRequest, response: &StoredResponse) -> Result<(), Error> {
        let row = EntryRow::new(request, response)?;
        self.write(vec![row]).await
    }

    /// Store a batch of responses in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_all(&self, entries: &[(WorkerRequest, StoredResponse)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        self.write(rows).await
    }

    async fn write(&self, rows: Vec<EntryRow>) -> Result<(), Error> {
        let name = self.name.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;

                for row in &rows {
                    tx.execute(
                        "INSERT INTO entries (partition, key_hash, method, url, status, headers_json, body, inserted_at)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                        ON CONFLICT(partition, key_hash) DO UPDATE SET
                            method = excluded.method,
                            url = excluded.url,
                            status = excluded.status,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            inserted_at = excluded.inserted_at",
                        params![
                            name,
                            row.key_hash,
                            row.method,
                            row.url,
                            row.status,
                            row.headers_json,
                            &row.body[..],
                            now
                        ],
                    )?;
                }

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of this partition in insertion order.
    pub async fn keys(&self) -> Result<Vec<EntryKey>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<EntryKey>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, inserted_at FROM entries
                    WHERE partition = ?1 ORDER BY inserted_at ASC, rowid ASC",
                )?;

                let keys = stmt
                    .query_map(params![name], |row| {
                        Ok(EntryKey { method: row.get(0)?, url: row.get(1)?, status: row.get(2)?, inserted_at: row.get(3)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry stored for a request.
    ///
    /// Returns whether an entry was removed.
    pub async fn delete(&self, request: &WorkerRequest) -> Result<bool, Error> {
        let key_hash = compute_request_key(request.method.as_str(), &request.cache_url());
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2", params![name, key_hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
