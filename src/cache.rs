//! Persistent, playlist-namespaced video cache.
//!
//! The cache stores every video the live pagination has ever surfaced,
//! keyed so a descending key walk replays videos newest-to-oldest, the
//! same order the Data API returns them. One scalar per playlist records
//! the largest feed size that was ever fully materialized: a cache built
//! for a shallower request carries no information about its own
//! completeness beyond that depth, so a deeper request discards it
//! wholesale rather than trusting it (see [`VideoCache::reset_if_stale`]).
//!
//! The cache is a pure optimization and never a correctness dependency:
//! every storage error is logged and the operation degrades to how an
//! absent cache would behave (`false` / empty / no-op). [`NoopCache`] is
//! the explicit null object for deployments with caching disabled or a
//! store that failed to open.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::warn;

use crate::config::Config;
use crate::models::Video;
use crate::source::VideoSource;

/// Abstract video cache for feed assembly.
///
/// Write operations (`reset_if_stale`, `put`, `update_max_limit`) run as
/// serialized transactions relative to each other; reads may interleave
/// with concurrent writes and may observe either state. Implementations
/// never surface storage errors to callers.
#[async_trait]
pub trait VideoCache: Send + Sync {
    /// Discard the playlist's records if they were materialized for a
    /// shallower limit than `limit`, and record `limit` as the new depth.
    ///
    /// Runs as a single transaction: a playlist with no recorded depth, or
    /// a recorded depth below `limit`, has all its records deleted and its
    /// depth set to `limit`. A playlist already materialized at `limit` or
    /// deeper is left untouched.
    async fn reset_if_stale(&self, playlist_id: &str, limit: usize);

    /// Whether this exact video is already cached for the playlist.
    ///
    /// Absence of the store, the namespace, or the record all answer
    /// `false`, never an error.
    async fn contains(&self, playlist_id: &str, video: &Video) -> bool;

    /// Idempotently upsert a batch of videos under their cache keys.
    async fn put(&self, playlist_id: &str, videos: &[Video]);

    /// Raise the playlist's recorded depth to `limit` if it is larger.
    async fn update_max_limit(&self, playlist_id: &str, limit: usize);

    /// Walk the playlist's records strictly older than `start_key`,
    /// newest first.
    ///
    /// Each call starts a fresh walk. The walk fetches one record per
    /// pull, so a consumer that stops early reads no further rows.
    fn iter_older_than(&self, playlist_id: &str, start_key: &str) -> Box<dyn VideoSource>;
}

/// Open the configured cache, degrading to [`NoopCache`] with a warning
/// when caching is disabled or the store cannot be opened.
pub async fn open_cache(config: &Config) -> Arc<dyn VideoCache> {
    if !config.cache.enabled {
        return Arc::new(NoopCache);
    }
    let path = match config.cache.resolved_path() {
        Ok(path) => path,
        Err(err) => {
            warn!(error = %err, "cannot determine cache location; caching disabled");
            return Arc::new(NoopCache);
        }
    };
    match SqliteCache::open(&path).await {
        Ok(cache) => Arc::new(cache),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not open cache; caching disabled");
            Arc::new(NoopCache)
        }
    }
}

// ============ SQLite implementation ============

/// SQLite-backed cache. One row per video, one row per playlist for the
/// recorded depth.
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (or create) the cache database at `path` and ensure the schema
    /// exists. WAL mode keeps concurrent feed requests from blocking each
    /// other on reads.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating cache directory {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS videos (
                playlist_id TEXT NOT NULL,
                cache_key   TEXT NOT NULL,
                payload     TEXT NOT NULL,
                PRIMARY KEY (playlist_id, cache_key)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS playlists (
                playlist_id TEXT PRIMARY KEY,
                max_limit   INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn try_reset_if_stale(&self, playlist_id: &str, limit: usize) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let max_limit: Option<i64> =
            sqlx::query_scalar("SELECT max_limit FROM playlists WHERE playlist_id = ?")
                .bind(playlist_id)
                .fetch_optional(&mut *tx)
                .await?;

        match max_limit {
            Some(seen) if seen >= limit as i64 => {}
            _ => {
                sqlx::query("DELETE FROM videos WHERE playlist_id = ?")
                    .bind(playlist_id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    r#"
                    INSERT INTO playlists (playlist_id, max_limit) VALUES (?, ?)
                    ON CONFLICT(playlist_id) DO UPDATE SET max_limit = excluded.max_limit
                    "#,
                )
                .bind(playlist_id)
                .bind(limit as i64)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn try_contains(&self, playlist_id: &str, video: &Video) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM videos WHERE playlist_id = ? AND cache_key = ?")
                .bind(playlist_id)
                .bind(video.cache_key())
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn try_put(&self, playlist_id: &str, videos: &[Video]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for video in videos {
            let payload = serde_json::to_string(video)?;
            sqlx::query(
                r#"
                INSERT INTO videos (playlist_id, cache_key, payload) VALUES (?, ?, ?)
                ON CONFLICT(playlist_id, cache_key) DO UPDATE SET payload = excluded.payload
                "#,
            )
            .bind(playlist_id)
            .bind(video.cache_key())
            .bind(payload)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn try_update_max_limit(&self, playlist_id: &str, limit: usize) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO playlists (playlist_id, max_limit) VALUES (?, ?)
            ON CONFLICT(playlist_id) DO UPDATE SET max_limit = MAX(max_limit, excluded.max_limit)
            "#,
        )
        .bind(playlist_id)
        .bind(limit as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Per-playlist record counts and recorded depths, for `cache stats`.
    pub async fn stats(&self) -> Result<Vec<PlaylistStats>> {
        let rows = sqlx::query(
            r#"
            SELECT p.playlist_id, p.max_limit, COUNT(v.cache_key) AS videos
            FROM playlists p
            LEFT JOIN videos v ON v.playlist_id = p.playlist_id
            GROUP BY p.playlist_id
            ORDER BY p.playlist_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PlaylistStats {
                playlist_id: row.get("playlist_id"),
                videos: row.get("videos"),
                max_limit: row.get("max_limit"),
            })
            .collect())
    }

    /// Drop every cached record and all recorded depths. Returns the number
    /// of video records removed.
    pub async fn clear(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM videos")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM playlists").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// Close the underlying pool. Mainly useful in tests that exercise the
    /// degraded path.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Per-playlist cache statistics.
pub struct PlaylistStats {
    pub playlist_id: String,
    pub videos: i64,
    pub max_limit: i64,
}

#[async_trait]
impl VideoCache for SqliteCache {
    async fn reset_if_stale(&self, playlist_id: &str, limit: usize) {
        if let Err(err) = self.try_reset_if_stale(playlist_id, limit).await {
            warn!(playlist_id, error = %err, "cache staleness check failed; proceeding uncached");
        }
    }

    async fn contains(&self, playlist_id: &str, video: &Video) -> bool {
        match self.try_contains(playlist_id, video).await {
            Ok(found) => found,
            Err(err) => {
                warn!(playlist_id, error = %err, "cache lookup failed");
                false
            }
        }
    }

    async fn put(&self, playlist_id: &str, videos: &[Video]) {
        if let Err(err) = self.try_put(playlist_id, videos).await {
            warn!(playlist_id, error = %err, "cache write failed");
        }
    }

    async fn update_max_limit(&self, playlist_id: &str, limit: usize) {
        if let Err(err) = self.try_update_max_limit(playlist_id, limit).await {
            warn!(playlist_id, error = %err, "cache limit update failed");
        }
    }

    fn iter_older_than(&self, playlist_id: &str, start_key: &str) -> Box<dyn VideoSource> {
        Box::new(CacheWalk {
            pool: self.pool.clone(),
            playlist_id: playlist_id.to_string(),
            cursor: start_key.to_string(),
            done: false,
        })
    }
}

/// Descending key walk over one playlist's records.
///
/// Fetches exactly one row per pull, so stopping the walk stops the reads.
/// Any storage or decode error ends the walk early; the fallback phase
/// then simply serves fewer items.
struct CacheWalk {
    pool: SqlitePool,
    playlist_id: String,
    cursor: String,
    done: bool,
}

#[async_trait]
impl VideoSource for CacheWalk {
    async fn next(&mut self) -> Option<Result<Video>> {
        if self.done {
            return None;
        }
        let row = sqlx::query(
            r#"
            SELECT cache_key, payload FROM videos
            WHERE playlist_id = ? AND cache_key < ?
            ORDER BY cache_key DESC
            LIMIT 1
            "#,
        )
        .bind(&self.playlist_id)
        .bind(&self.cursor)
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some(row)) => {
                self.cursor = row.get("cache_key");
                let payload: String = row.get("payload");
                match serde_json::from_str(&payload) {
                    Ok(video) => Some(Ok(video)),
                    Err(err) => {
                        warn!(playlist_id = %self.playlist_id, error = %err, "undecodable cache record; ending walk");
                        self.done = true;
                        None
                    }
                }
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                warn!(playlist_id = %self.playlist_id, error = %err, "cache walk failed; ending early");
                self.done = true;
                None
            }
        }
    }
}

// ============ Null object ============

/// Cache used when caching is disabled or unavailable: every lookup
/// misses, every write vanishes, every walk is empty. Feed assembly over
/// this cache behaves exactly like a cacheless deployment.
pub struct NoopCache;

#[async_trait]
impl VideoCache for NoopCache {
    async fn reset_if_stale(&self, _playlist_id: &str, _limit: usize) {}

    async fn contains(&self, _playlist_id: &str, _video: &Video) -> bool {
        false
    }

    async fn put(&self, _playlist_id: &str, _videos: &[Video]) {}

    async fn update_max_limit(&self, _playlist_id: &str, _limit: usize) {}

    fn iter_older_than(&self, _playlist_id: &str, _start_key: &str) -> Box<dyn VideoSource> {
        Box::new(Exhausted)
    }
}

struct Exhausted;

#[async_trait]
impl VideoSource for Exhausted {
    async fn next(&mut self) -> Option<Result<Video>> {
        None
    }
}
