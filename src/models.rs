//! Core data types used throughout tubecast.
//!
//! These types represent the channels and videos that flow through the
//! pagination, caching, and feed assembly pipeline. RSS-level concerns
//! (watch links, enclosures, MIME types) are derived at render time and
//! never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single uploaded video, as it flows through the merge engine and cache.
///
/// `published` doubles as the chronological ordering key: together with the
/// video id it forms the cache key (see [`Video::cache_key`]). Everything
/// else is descriptive payload the engine never inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub video_id: String,
    pub published: DateTime<Utc>,
    pub title: String,
    pub description: String,
}

impl Video {
    /// Key under which this video is cached within its playlist namespace.
    ///
    /// The fixed-width UTC timestamp prefix makes byte order equal
    /// chronological order, which the cache's descending range walk relies
    /// on.
    pub fn cache_key(&self) -> String {
        format!(
            "{}-{}",
            self.published.format("%Y-%m-%dT%H:%M:%SZ"),
            self.video_id
        )
    }

    /// Public watch page for this video.
    pub fn watch_url(&self) -> String {
        format!("https://youtube.com/watch?v={}", self.video_id)
    }
}

/// Channel metadata resolved from the Data API.
#[derive(Debug, Clone)]
pub struct Channel {
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<Thumbnail>,
}

impl Channel {
    /// Public channel page.
    pub fn channel_url(&self) -> String {
        format!("https://youtube.com/channel/{}", self.channel_id)
    }
}

/// A channel thumbnail image.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// An assembled feed: channel metadata plus its newest-first videos.
#[derive(Debug, Clone)]
pub struct ChannelFeed {
    pub channel: Channel,
    pub videos: Vec<Video>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn video(id: &str, secs: i64) -> Video {
        Video {
            video_id: id.to_string(),
            published: Utc.timestamp_opt(secs, 0).unwrap(),
            title: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_cache_key_format() {
        let v = video("abc123", 1700000000);
        assert_eq!(v.cache_key(), "2023-11-14T22:13:20Z-abc123");
    }

    #[test]
    fn test_cache_key_order_matches_chronology() {
        // Byte order of keys must equal publish order, including across
        // month/year boundaries.
        let older = video("zzz", 1609459199); // 2020-12-31T23:59:59Z
        let newer = video("aaa", 1609459200); // 2021-01-01T00:00:00Z
        assert!(older.cache_key() < newer.cache_key());

        let a = video("b", 1700000000);
        let b = video("a", 1700000001);
        assert!(a.cache_key() < b.cache_key());
    }
}
