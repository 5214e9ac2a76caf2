//! YouTube Data API v3 client and the uploads paginator.
//!
//! Talks to the REST API directly with an API key, no vendor SDK. Two
//! calls are used: `channels.list` to resolve a channel (by raw id or by
//! `@handle`) and `playlistItems.list` to page through its uploads,
//! newest first.
//!
//! # Authentication
//!
//! Every request carries the API key as a query parameter. The key comes
//! from the config file or the `TUBECAST_API_KEY` environment variable.
//!
//! # Pagination
//!
//! `playlistItems.list` pages are chained through the `nextPageToken`
//! mechanism. [`PlaylistPager`] only issues a page request from inside
//! `next()`, so a consumer that stops pulling (the bounded-take adapter
//! reaching its cap, or a cancelled request dropping the future) issues
//! no further page requests.

use std::collections::VecDeque;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{Channel, Thumbnail, Video};
use crate::source::VideoSource;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Thin Data API client. Cheap to construct; holds a pooled HTTP client.
pub struct YoutubeClient {
    http: reqwest::Client,
    api_key: String,
    page_size: usize,
}

impl YoutubeClient {
    pub fn new(api_key: String, page_size: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            page_size,
        }
    }

    /// Resolve a channel by raw id (`UC…`) or handle (`@name`).
    pub async fn resolve_channel(&self, id_or_handle: &str) -> Result<Channel> {
        let id_param = if id_or_handle.starts_with('@') {
            ("forHandle", id_or_handle)
        } else {
            ("id", id_or_handle)
        };

        let response = self
            .http
            .get(format!("{API_BASE}/channels"))
            .query(&[
                ("part", "snippet"),
                ("key", self.api_key.as_str()),
                id_param,
            ])
            .send()
            .await
            .context("requesting channel details")?;
        let listing: ChannelListResponse = read_api_response(response)
            .await
            .context("reading channel details")?;

        if listing.items.len() != 1 {
            bail!("could not find channel {id_or_handle}");
        }
        let item = listing.items.into_iter().next().unwrap();

        Ok(Channel {
            channel_id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            thumbnail: item.snippet.thumbnails.default.map(|t| Thumbnail {
                url: t.url,
                width: t.width,
                height: t.height,
            }),
        })
    }

    /// Fetch one page of a playlist's items, newest first.
    async fn playlist_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage> {
        let page_size = self.page_size.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("key", self.api_key.as_str()),
            ("playlistId", playlist_id),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http
            .get(format!("{API_BASE}/playlistItems"))
            .query(&query)
            .send()
            .await
            .with_context(|| format!("requesting items of playlist {playlist_id}"))?;
        let listing: PlaylistItemsResponse = read_api_response(response)
            .await
            .with_context(|| format!("reading items of playlist {playlist_id}"))?;

        let mut videos = Vec::with_capacity(listing.items.len());
        for item in listing.items {
            videos.push(item.into_video()?);
        }

        Ok(PlaylistPage {
            videos,
            next_page_token: listing.next_page_token,
        })
    }
}

/// Derive the shorts-free uploads playlist (`UULF…`) from a channel id
/// (`UC…`).
pub fn uploads_playlist_id(channel_id: &str) -> Result<String> {
    let rest = channel_id
        .strip_prefix("UC")
        .ok_or_else(|| anyhow!("unexpected channel id format: {channel_id}"))?;
    Ok(format!("UULF{rest}"))
}

async fn read_api_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
            Ok(envelope) => envelope.error.message,
            Err(_) => body.chars().take(200).collect(),
        };
        bail!("youtube api returned {status}: {detail}");
    }
    response.json::<T>().await.context("decoding api response")
}

/// One decoded page of playlist items.
struct PlaylistPage {
    videos: Vec<Video>,
    next_page_token: Option<String>,
}

/// Lazy newest-first walk over a playlist's uploads.
///
/// Buffers one API page at a time and refills only when the buffer runs
/// dry. An API error terminates the walk; every later pull answers `None`.
pub struct PlaylistPager<'a> {
    client: &'a YoutubeClient,
    playlist_id: String,
    buffer: VecDeque<Video>,
    next_page: Option<String>,
    started: bool,
    failed: bool,
}

impl<'a> PlaylistPager<'a> {
    pub fn new(client: &'a YoutubeClient, playlist_id: &str) -> Self {
        Self {
            client,
            playlist_id: playlist_id.to_string(),
            buffer: VecDeque::new(),
            next_page: None,
            started: false,
            failed: false,
        }
    }
}

#[async_trait]
impl VideoSource for PlaylistPager<'_> {
    async fn next(&mut self) -> Option<Result<Video>> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(video) = self.buffer.pop_front() {
                return Some(Ok(video));
            }
            if self.started && self.next_page.is_none() {
                return None;
            }
            let token = self.next_page.take();
            self.started = true;
            match self
                .client
                .playlist_page(&self.playlist_id, token.as_deref())
                .await
            {
                Ok(page) => {
                    self.next_page = page.next_page_token;
                    self.buffer.extend(page.videos);
                    // An empty tail page ends the walk via the loop.
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

// ============ API response types ============

#[derive(Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelResource>,
}

#[derive(Deserialize)]
struct ChannelResource {
    id: String,
    snippet: ChannelSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    default: Option<ThumbnailResource>,
}

#[derive(Deserialize)]
struct ThumbnailResource {
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItemResource>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistItemResource {
    snippet: PlaylistItemSnippet,
}

impl PlaylistItemResource {
    fn into_video(self) -> Result<Video> {
        let published = DateTime::parse_from_rfc3339(&self.snippet.published_at)
            .with_context(|| {
                format!(
                    "could not parse publish date of video {}",
                    self.snippet.resource_id.video_id
                )
            })?
            .with_timezone(&Utc);
        Ok(Video {
            video_id: self.snippet.resource_id.video_id,
            published,
            title: self.snippet.title,
            description: self.snippet.description,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    title: String,
    #[serde(default)]
    description: String,
    published_at: String,
    resource_id: ResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}
