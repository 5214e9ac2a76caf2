//! Channel feed service.
//!
//! Ties the pieces together for one request: resolve the channel, walk its
//! uploads playlist through the merge engine, and hand back channel
//! metadata plus the assembled videos. The cache handle is injected at
//! construction so the service works identically over the SQLite cache,
//! the no-op cache, and test fakes.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::assemble::assemble_videos;
use crate::cache::VideoCache;
use crate::models::ChannelFeed;
use crate::youtube::{uploads_playlist_id, PlaylistPager, YoutubeClient};

pub struct FeedService {
    client: YoutubeClient,
    cache: Arc<dyn VideoCache>,
}

impl FeedService {
    pub fn new(client: YoutubeClient, cache: Arc<dyn VideoCache>) -> Self {
        Self { client, cache }
    }

    /// Assemble up to `limit` of the channel's newest uploads.
    ///
    /// `channel` is a raw channel id (`UC…`) or a handle (`@name`).
    pub async fn channel_feed(&self, channel: &str, limit: usize) -> Result<ChannelFeed> {
        let channel = self.client.resolve_channel(channel).await?;
        let playlist_id = uploads_playlist_id(&channel.channel_id)?;
        let pager = PlaylistPager::new(&self.client, &playlist_id);
        let videos = assemble_videos(self.cache.as_ref(), pager, &playlist_id, limit)
            .await
            .with_context(|| format!("loading videos of channel {}", channel.channel_id))?;
        Ok(ChannelFeed { channel, videos })
    }
}
