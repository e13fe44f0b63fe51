//! Entry CRUD operations.
//!
//! Provides functions for storing, matching, listing, and deleting cached
//! responses within a partition.

use super::connection::CacheStorage;
use crate::http::{Request, Response};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored request→response pair.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub partition: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    pub stored_at: String,
}

/// Raw row shape; headers are decoded outside the rusqlite row closure.
struct EntryRow {
    partition: String,
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
    response_url: Option<String>,
    stored_at: String,
}

impl EntryRow {
    const COLUMNS: &'static str =
        "e.partition, e.key_hash, e.method, e.url, e.status, e.headers_json, e.body, e.response_url, e.stored_at";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            partition: row.get(0)?,
            key_hash: row.get(1)?,
            method: row.get(2)?,
            url: row.get(3)?,
            status: row.get(4)?,
            headers_json: row.get(5)?,
            body: row.get(6)?,
            response_url: row.get(7)?,
            stored_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<CachedEntry, Error> {
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("{} headers: {e}", self.url)))?;
        Ok(CachedEntry {
            partition: self.partition,
            key_hash: self.key_hash,
            method: self.method,
            url: self.url,
            response: Response { status: self.status, headers, body: self.body, url: self.response_url },
            stored_at: self.stored_at,
        })
    }
}

impl CacheStorage {
    /// Store a response for a request, replacing any previous entry.
    ///
    /// The partition is created if it does not exist yet. Callers decide
    /// what is cacheable; this stores whatever it is given.
    pub async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let partition = partition.to_string();
        let key_hash = request.cache_key();
        let method = request.method.to_ascii_uppercase();
        let url = request.key_url();
        let response = response.clone();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![&partition, &now],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        partition, key_hash, method, url, status, headers_json, body, response_url, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(partition, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        response_url = excluded.response_url,
                        stored_at = excluded.stored_at",
                    params![
                        &partition,
                        &key_hash,
                        &method,
                        &url,
                        response.status,
                        &headers_json,
                        &response.body,
                        &response.url,
                        &now,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored for a request in one partition.
    pub async fn match_request(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        let partition = partition.to_string();
        let key_hash = request.cache_key();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let sql = format!(
                    "SELECT {} FROM entries e WHERE e.partition = ?1 AND e.key_hash = ?2",
                    EntryRow::COLUMNS
                );
                let result = conn.query_row(&sql, params![partition, key_hash], EntryRow::from_row);
                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(|r| r.decode().map(|e| e.response)).transpose()
    }

    /// All readable entries of a partition, in key order.
    ///
    /// Rows whose stored headers no longer decode are logged and skipped.
    pub async fn entries(&self, partition: &str) -> Result<Vec<CachedEntry>, Error> {
        let partition = partition.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let sql = format!(
                    "SELECT {} FROM entries e WHERE e.partition = ?1 ORDER BY e.key_hash",
                    EntryRow::COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![partition], EntryRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        let entries = rows
            .into_iter()
            .filter_map(|row| match row.decode() {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {}", e);
                    None
                }
            })
            .collect();
        Ok(entries)
    }

    /// Delete one entry by key. Returns whether it existed.
    pub async fn delete_entry(&self, partition: &str, key_hash: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![partition, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn entry_count(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
