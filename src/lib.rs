//! # tubecast
//!
//! Bridge YouTube channels into podcast-ready RSS feeds, with a
//! quota-friendly persistent cache.
//!
//! tubecast resolves a channel, pages through its uploads playlist via
//! the Data API, and serves the result as RSS, fetching live only what
//! it has not seen before. A persistent SQLite cache remembers every
//! video that has ever been listed, so an unchanged channel costs one
//! page request no matter how large the feed is.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────┐
//! │ Data API v3  │──▶│ Merge Engine   │──▶│  SQLite   │
//! │ (paginated)  │   │ live ⊕ cached │   │  cache    │
//! └──────────────┘   └──────┬────────┘   └──────────┘
//!                           │
//!             ┌─────────────┤
//!             ▼             ▼
//!        ┌──────────┐ ┌──────────┐
//!        │   CLI    │ │   HTTP   │
//!        │ (fetch)  │ │ (serve)  │
//!        └──────────┘ └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export TUBECAST_API_KEY=...
//! tubecast fetch @somechannel --limit 20   # one-shot RSS to stdout
//! tubecast serve                           # http://127.0.0.1:9494/@somechannel
//! tubecast cache stats                     # what's cached, and how deep
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`source`] | Lazy video sequences and the bounded-take adapter |
//! | [`cache`] | Persistent ordered video cache (SQLite, optional) |
//! | [`youtube`] | Data API client and uploads paginator |
//! | [`assemble`] | Feed assembly: merge live pagination with the cache |
//! | [`feed`] | Channel feed service |
//! | [`rss`] | RSS 2.0 serialization |
//! | [`server`] | HTTP server |
//! | [`ytdlp`] | Media URL resolution via yt-dlp |

pub mod assemble;
pub mod cache;
pub mod cache_cmd;
pub mod config;
pub mod feed;
pub mod fetch;
pub mod models;
pub mod rss;
pub mod server;
pub mod source;
pub mod youtube;
pub mod ytdlp;
