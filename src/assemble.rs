//! Feed assembly: merge live pagination with the persistent cache.
//!
//! For a requested feed size L the engine walks the remote listing
//! newest-first only until it meets a video it has already cached (the
//! *pivot*) and serves everything older than that from the cache. This
//! keeps remote work proportional to what actually changed: an unchanged
//! channel costs one page request regardless of L.
//!
//! The invariants that make this safe:
//!
//! - Cache presence is only trusted up to the depth the cache was last
//!   fully materialized for. A request deeper than that depth resets the
//!   namespace first (`reset_if_stale`), so a stale shallow cache can
//!   never truncate a deeper feed.
//! - Freshness is established per request by the live walk from the top;
//!   a cached video is never taken as evidence that nothing newer exists.
//! - A remote failure aborts the whole request with nothing persisted
//!   from the failed walk and no partial result returned. Cache failures
//!   never abort anything; the engine just degrades toward live-only.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cache::VideoCache;
use crate::models::Video;
use crate::source::{Bounded, VideoSource};

/// Assemble up to `limit` videos of a playlist, newest first.
///
/// `source` is the live newest-first listing (normally a
/// [`PlaylistPager`](crate::youtube::PlaylistPager)); `cache` supplies
/// everything the live phase can skip. Returns at most `limit` videos with
/// unique ids, in chronological (newest-first) order.
pub async fn assemble_videos<S>(
    cache: &dyn VideoCache,
    source: S,
    playlist_id: &str,
    limit: usize,
) -> Result<Vec<Video>>
where
    S: VideoSource,
{
    if limit == 0 {
        return Ok(Vec::new());
    }

    cache.reset_if_stale(playlist_id, limit).await;

    // Live phase: walk the remote newest-first until the limit is reached,
    // the listing is exhausted, or we meet a video we already know.
    let mut live = Bounded::new(limit, source);
    let mut fresh: Vec<Video> = Vec::new();
    let mut pivot: Option<Video> = None;
    while let Some(item) = live.next().await {
        let video =
            item.with_context(|| format!("listing uploads of playlist {playlist_id}"))?;
        if cache.contains(playlist_id, &video).await {
            pivot = Some(video);
            break;
        }
        fresh.push(video);
    }

    if !fresh.is_empty() {
        cache.put(playlist_id, &fresh).await;
    }
    debug!(
        playlist_id,
        fresh = fresh.len(),
        pivot = pivot.is_some(),
        "live phase done"
    );

    let mut feed = fresh;
    if feed.len() < limit {
        // The pivot marks where the live walk met known territory: emit it
        // here exactly once and continue strictly older than its key.
        // Without a pivot the walk continues below the oldest live video.
        // An empty live phase leaves no continuation point at all.
        let start_key = match pivot {
            Some(p) => {
                let key = p.cache_key();
                feed.push(p);
                Some(key)
            }
            None => feed.last().map(Video::cache_key),
        };
        if let Some(start_key) = start_key {
            let walk = cache.iter_older_than(playlist_id, &start_key);
            let mut rest = Bounded::new(limit - feed.len(), walk);
            while let Some(item) = rest.next().await {
                match item {
                    Ok(video) => feed.push(video),
                    Err(err) => {
                        warn!(playlist_id, error = %err, "cache fallback ended early");
                        break;
                    }
                }
            }
        }
    }

    cache.update_max_limit(playlist_id, limit).await;
    Ok(feed)
}
