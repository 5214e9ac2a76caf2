//! One-shot feed command: assemble a channel's feed and write RSS to
//! stdout.
//!
//! No enclosures are emitted in this mode: they would have to point at a
//! running server's `/watch` endpoint, and there is none.

use std::sync::Arc;

use anyhow::Result;

use crate::cache::VideoCache;
use crate::config::Config;
use crate::feed::FeedService;
use crate::rss::{render_rss, FeedOptions};
use crate::youtube::YoutubeClient;

pub async fn run_fetch(
    config: &Config,
    cache: Arc<dyn VideoCache>,
    channel: &str,
    limit: Option<usize>,
    format: Option<String>,
    mime_type: Option<String>,
) -> Result<()> {
    let client = YoutubeClient::new(config.api_key()?, config.api.page_size);
    let service = FeedService::new(client, cache);

    let limit = limit
        .filter(|&limit| limit > 0)
        .unwrap_or(config.feed.default_limit);
    let feed = service.channel_feed(channel, limit).await?;

    let opts = FeedOptions {
        format,
        mime_type: mime_type.unwrap_or_else(|| config.feed.mime_type.clone()),
        enclosure_base: None,
    };
    println!("{}", render_rss(&feed, &opts)?);

    Ok(())
}
