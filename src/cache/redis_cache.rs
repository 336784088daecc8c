//! Redis-backed metadata cache.
//!
//! Uses the synchronous `redis` client. Worker threads never share a
//! connection: each command checks one out of a small idle pool and puts it
//! back afterwards. A connection that saw an error is dropped instead of
//! returned, so a broken socket is never reused.
//!
//! The two writes for a file go out as one pipeline (`SET`, `SET`) without
//! `MULTI`, which keeps the write path to a single round trip.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use redis::{Client, Connection, RedisResult};

use super::{CacheError, CacheOptions, CacheResult, KeyScan, MetadataCache};

/// Connection settings for [`RedisCache`].
#[derive(Debug, Clone)]
pub struct RedisOptions {
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
    /// Read/write timeout per command
    pub io_timeout: Duration,
    /// `COUNT` hint for each `SCAN` round trip
    pub scan_batch: usize,
    /// Idle connections kept for reuse
    pub max_idle: usize,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self::from(&CacheOptions::default())
    }
}

impl From<&CacheOptions> for RedisOptions {
    fn from(options: &CacheOptions) -> Self {
        Self {
            connect_timeout: options.connect_timeout,
            io_timeout: options.io_timeout,
            scan_batch: options.scan_batch.max(1),
            max_idle: options.max_idle,
        }
    }
}

/// Metadata cache stored in a Redis-protocol server.
pub struct RedisCache {
    client: Client,
    url: String,
    options: RedisOptions,
    /// Idle connections ready for reuse
    available: Mutex<Vec<Connection>>,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("url", &self.url)
            .field("options", &self.options)
            .field("idle", &self.available.lock().len())
            .finish()
    }
}

impl RedisCache {
    /// Create a client for `url` without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the URL cannot be parsed.
    pub fn new(url: &str, options: RedisOptions) -> CacheResult<Self> {
        let client = Client::open(url).map_err(|e| CacheError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            url: url.to_string(),
            available: Mutex::new(Vec::with_capacity(options.max_idle)),
            options,
        })
    }

    /// Create a client and verify the server answers `PING`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the URL is invalid or the
    /// server cannot be reached.
    pub fn connect(url: &str, options: RedisOptions) -> CacheResult<Self> {
        let cache = Self::new(url, options)?;
        cache.ping().map_err(|e| CacheError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        log::debug!("Connected to cache at {}", url);
        Ok(cache)
    }

    /// The URL this client talks to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of idle pooled connections.
    #[must_use]
    pub fn idle_connections(&self) -> usize {
        self.available.lock().len()
    }

    /// Take an idle connection or open a new one.
    fn checkout(&self) -> CacheResult<Connection> {
        if let Some(conn) = self.available.lock().pop() {
            return Ok(conn);
        }

        let conn = self
            .client
            .get_connection_with_timeout(self.options.connect_timeout)
            .map_err(|e| CacheError::Connection {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;
        conn.set_read_timeout(Some(self.options.io_timeout))?;
        conn.set_write_timeout(Some(self.options.io_timeout))?;
        log::trace!("Opened new cache connection to {}", self.url);
        Ok(conn)
    }

    /// Return a healthy connection to the idle pool.
    fn checkin(&self, conn: Connection) {
        let mut available = self.available.lock();
        if available.len() < self.options.max_idle {
            available.push(conn);
        }
    }

    /// Run one command on a pooled connection.
    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> RedisResult<T>,
    ) -> CacheResult<T> {
        let mut conn = self.checkout()?;
        match op(&mut conn) {
            Ok(value) => {
                self.checkin(conn);
                Ok(value)
            }
            Err(e) => {
                log::debug!("Dropping cache connection after error: {}", e);
                Err(e.into())
            }
        }
    }
}

impl MetadataCache for RedisCache {
    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.with_connection(|conn| redis::cmd("SET").arg(key).arg(value).query::<()>(conn))
    }

    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        self.with_connection(|conn| {
            let mut pipe = redis::pipe();
            for (key, value) in entries {
                pipe.set(key.as_str(), value.as_slice()).ignore();
            }
            pipe.query::<()>(conn)
        })
    }

    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.with_connection(|conn| redis::cmd("GET").arg(key).query::<Option<Vec<u8>>>(conn))
    }

    fn scan_keys(&self) -> CacheResult<KeyScan<'_>> {
        let conn = self.checkout()?;
        Ok(KeyScan::new(RedisKeyScan {
            cache: self,
            conn: Some(conn),
            cursor: 0,
            buffer: VecDeque::new(),
            finished: false,
        }))
    }

    fn ping(&self) -> CacheResult<()> {
        self.with_connection(|conn| redis::cmd("PING").query::<String>(conn))
            .map(drop)
    }
}

/// Cursor-driven `SCAN` over the whole keyspace.
///
/// Holds one connection for its lifetime and hands it back when dropped
/// after a clean finish.
struct RedisKeyScan<'a> {
    cache: &'a RedisCache,
    conn: Option<Connection>,
    cursor: u64,
    buffer: VecDeque<String>,
    finished: bool,
}

impl RedisKeyScan<'_> {
    /// Fetch the next batch into the buffer.
    fn fetch(&mut self) -> Option<CacheResult<()>> {
        let conn = self.conn.as_mut()?;

        let reply: RedisResult<(u64, Vec<Vec<u8>>)> = redis::cmd("SCAN")
            .cursor_arg(self.cursor)
            .arg("COUNT")
            .arg(self.cache.options.scan_batch)
            .query(conn);

        match reply {
            Ok((cursor, keys)) => {
                self.cursor = cursor;
                self.finished = cursor == 0;
                // Keys written by this tool are ASCII; anything else is foreign
                self.buffer
                    .extend(keys.into_iter().filter_map(|k| String::from_utf8(k).ok()));
                Some(Ok(()))
            }
            Err(e) => {
                // Broken connection: drop it and end the sequence after this error
                self.conn = None;
                Some(Err(e.into()))
            }
        }
    }
}

impl Iterator for RedisKeyScan<'_> {
    type Item = CacheResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(key) = self.buffer.pop_front() {
                return Some(Ok(key));
            }
            if self.finished {
                return None;
            }
            match self.fetch()? {
                Ok(()) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl Drop for RedisKeyScan<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.finished {
                self.cache.checkin(conn);
            }
        }
    }
}
