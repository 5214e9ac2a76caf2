//! End-to-end tests of feed assembly over the real SQLite cache.
//!
//! These drive the merge engine with a scripted remote listing and a
//! cache database in a temp directory, covering the cross-request
//! behaviors the in-memory unit tests cannot: persistence, staleness
//! resets between requests with growing limits, and degradation when the
//! store goes away.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use tubecast::assemble::assemble_videos;
use tubecast::cache::{open_cache, SqliteCache, VideoCache};
use tubecast::config::Config;
use tubecast::models::Video;
use tubecast::source::VideoSource;

const PLAYLIST: &str = "UULFdeadbeef";

fn video(id: &str, secs: i64) -> Video {
    Video {
        video_id: id.to_string(),
        published: Utc.timestamp_opt(secs, 0).unwrap(),
        title: format!("video {id}"),
        description: String::new(),
    }
}

/// Five uploads, newest first: v5 (newest) .. v1 (oldest).
fn uploads() -> Vec<Video> {
    (0..5).map(|i| video(&format!("v{}", 5 - i), 100 - i)).collect()
}

fn ids(videos: &[Video]) -> Vec<&str> {
    videos.iter().map(|v| v.video_id.as_str()).collect()
}

/// Scripted remote listing that counts how many elements were pulled.
struct Remote {
    items: VecDeque<Video>,
    pulled: Arc<AtomicUsize>,
}

impl Remote {
    fn new(videos: Vec<Video>) -> (Self, Arc<AtomicUsize>) {
        let pulled = Arc::new(AtomicUsize::new(0));
        (
            Self {
                items: videos.into(),
                pulled: pulled.clone(),
            },
            pulled,
        )
    }
}

#[async_trait]
impl VideoSource for Remote {
    async fn next(&mut self) -> Option<Result<Video>> {
        let item = self.items.pop_front()?;
        self.pulled.fetch_add(1, Ordering::SeqCst);
        Some(Ok(item))
    }
}

async fn temp_cache() -> (TempDir, SqliteCache) {
    let tmp = TempDir::new().unwrap();
    let cache = SqliteCache::open(&tmp.path().join("cache.db")).await.unwrap();
    (tmp, cache)
}

#[tokio::test]
async fn test_first_request_persists_and_records_depth() {
    let (_tmp, cache) = temp_cache().await;
    let (remote, pulled) = Remote::new(uploads());

    let feed = assemble_videos(&cache, remote, PLAYLIST, 3).await.unwrap();

    assert_eq!(ids(&feed), ["v5", "v4", "v3"]);
    assert_eq!(pulled.load(Ordering::SeqCst), 3);

    // All three live items were persisted and the depth was recorded.
    for v in &feed {
        assert!(cache.contains(PLAYLIST, v).await);
    }
    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].playlist_id, PLAYLIST);
    assert_eq!(stats[0].videos, 3);
    assert_eq!(stats[0].max_limit, 3);
}

#[tokio::test]
async fn test_growing_limit_resets_and_refetches() {
    let (_tmp, cache) = temp_cache().await;

    let (first, _) = Remote::new(uploads());
    let feed = assemble_videos(&cache, first, PLAYLIST, 3).await.unwrap();
    assert_eq!(ids(&feed), ["v5", "v4", "v3"]);

    // Deeper request: the depth-3 cache is discarded, the live walk runs
    // to the new bound with no pivot, and all five come back.
    let (second, pulled) = Remote::new(uploads());
    let feed = assemble_videos(&cache, second, PLAYLIST, 5).await.unwrap();
    assert_eq!(ids(&feed), ["v5", "v4", "v3", "v2", "v1"]);
    assert_eq!(pulled.load(Ordering::SeqCst), 5);

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats[0].videos, 5);
    assert_eq!(stats[0].max_limit, 5);
}

#[tokio::test]
async fn test_unchanged_channel_costs_one_pull() {
    let (_tmp, cache) = temp_cache().await;

    let (first, _) = Remote::new(uploads());
    let a = assemble_videos(&cache, first, PLAYLIST, 5).await.unwrap();

    let (second, pulled) = Remote::new(uploads());
    let b = assemble_videos(&cache, second, PLAYLIST, 5).await.unwrap();

    assert_eq!(ids(&a), ids(&b));
    // The newest video was the pivot: one pull, the rest from cache.
    assert_eq!(pulled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_new_uploads_merge_with_cached_tail() {
    let (_tmp, cache) = temp_cache().await;

    let (first, _) = Remote::new(uploads());
    assemble_videos(&cache, first, PLAYLIST, 5).await.unwrap();

    // Two new uploads appear; a shallower request must stitch them onto
    // the cached tail without refetching it.
    let mut grown = vec![video("v7", 102), video("v6", 101)];
    grown.extend(uploads());
    let (second, pulled) = Remote::new(grown);

    let feed = assemble_videos(&cache, second, PLAYLIST, 4).await.unwrap();

    assert_eq!(ids(&feed), ["v7", "v6", "v5", "v4"]);
    // v7 and v6 were new, v5 was the pivot; v4 came from the cache.
    assert_eq!(pulled.load(Ordering::SeqCst), 3);

    // The new uploads joined the cache for the next request.
    assert!(cache.contains(PLAYLIST, &video("v7", 102)).await);
    assert!(cache.contains(PLAYLIST, &video("v6", 101)).await);
}

#[tokio::test]
async fn test_playlists_are_independent() {
    let (_tmp, cache) = temp_cache().await;

    let (first, _) = Remote::new(uploads());
    assemble_videos(&cache, first, PLAYLIST, 5).await.unwrap();

    let (other, pulled) = Remote::new(uploads());
    let feed = assemble_videos(&cache, other, "UULFother", 5).await.unwrap();

    // A different playlist shares nothing: full live fetch.
    assert_eq!(feed.len(), 5);
    assert_eq!(pulled.load(Ordering::SeqCst), 5);

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.len(), 2);
}

#[tokio::test]
async fn test_walk_is_strictly_older_and_descending() {
    let (_tmp, cache) = temp_cache().await;
    let videos = uploads();
    cache.put(PLAYLIST, &videos).await;

    // Start at v4's key: only v3, v2, v1 follow, newest first.
    let mut walk = cache.iter_older_than(PLAYLIST, &videos[1].cache_key());
    let mut seen = Vec::new();
    while let Some(item) = walk.next().await {
        seen.push(item.unwrap().video_id);
    }
    assert_eq!(seen, ["v3", "v2", "v1"]);
}

#[tokio::test]
async fn test_put_is_idempotent() {
    let (_tmp, cache) = temp_cache().await;
    let videos = uploads();
    cache.put(PLAYLIST, &videos).await;
    cache.put(PLAYLIST, &videos).await;

    cache.update_max_limit(PLAYLIST, 5).await;
    let stats = cache.stats().await.unwrap();
    assert_eq!(stats[0].videos, 5);
}

#[tokio::test]
async fn test_update_max_limit_never_shrinks() {
    let (_tmp, cache) = temp_cache().await;
    cache.update_max_limit(PLAYLIST, 10).await;
    cache.update_max_limit(PLAYLIST, 3).await;

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats[0].max_limit, 10);
}

#[tokio::test]
async fn test_reset_spares_equal_or_deeper_cache() {
    let (_tmp, cache) = temp_cache().await;
    let videos = uploads();
    cache.put(PLAYLIST, &videos).await;
    cache.update_max_limit(PLAYLIST, 5).await;

    cache.reset_if_stale(PLAYLIST, 5).await;
    cache.reset_if_stale(PLAYLIST, 2).await;
    assert!(cache.contains(PLAYLIST, &videos[0]).await);

    cache.reset_if_stale(PLAYLIST, 6).await;
    assert!(!cache.contains(PLAYLIST, &videos[0]).await);
    let stats = cache.stats().await.unwrap();
    assert_eq!(stats[0].max_limit, 6);
}

#[tokio::test]
async fn test_closed_store_degrades_to_cacheless() {
    let (_tmp, cache) = temp_cache().await;
    let videos = uploads();
    cache.put(PLAYLIST, &videos).await;
    cache.close().await;

    // Every operation behaves as if the store were absent.
    assert!(!cache.contains(PLAYLIST, &videos[0]).await);
    cache.put(PLAYLIST, &videos).await;
    cache.reset_if_stale(PLAYLIST, 3).await;

    // Assembly over the dead store equals the cacheless result.
    let (remote, _) = Remote::new(uploads());
    let feed = assemble_videos(&cache, remote, PLAYLIST, 3).await.unwrap();
    assert_eq!(ids(&feed), ["v5", "v4", "v3"]);
}

#[tokio::test]
async fn test_disabled_cache_serves_live_only() {
    let mut config = Config::default();
    config.cache.enabled = false;
    let cache = open_cache(&config).await;

    let (remote, _) = Remote::new(uploads());
    let feed = assemble_videos(cache.as_ref(), remote, PLAYLIST, 2).await.unwrap();
    assert_eq!(ids(&feed), ["v5", "v4"]);

    // Nothing was remembered between requests.
    let (again, pulled) = Remote::new(uploads());
    let feed = assemble_videos(cache.as_ref(), again, PLAYLIST, 2).await.unwrap();
    assert_eq!(ids(&feed), ["v5", "v4"]);
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_clear_empties_everything() {
    let (_tmp, cache) = temp_cache().await;
    let videos = uploads();
    cache.put(PLAYLIST, &videos).await;
    cache.update_max_limit(PLAYLIST, 5).await;

    let removed = cache.clear().await.unwrap();
    assert_eq!(removed, 5);
    assert!(cache.stats().await.unwrap().is_empty());
    assert!(!cache.contains(PLAYLIST, &videos[0]).await);
}
