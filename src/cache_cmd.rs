//! Cache maintenance commands.
//!
//! Provides a quick summary of what's cached (per-playlist video counts
//! and the depth each playlist was materialized for) plus a way to wipe
//! the cache without hunting down the database file. Used by
//! `tubecast cache stats` and `tubecast cache clear`.

use anyhow::Result;

use crate::cache::SqliteCache;
use crate::config::Config;

/// Run the stats command: query the cache database and print a summary.
pub async fn run_cache_stats(config: &Config) -> Result<()> {
    let path = config.cache.resolved_path()?;
    let cache = SqliteCache::open(&path).await?;

    let db_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    let stats = cache.stats().await?;
    let total: i64 = stats.iter().map(|s| s.videos).sum();

    println!("tubecast — Cache Stats");
    println!("======================");
    println!();
    println!("  Database:   {}", path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!("  Videos:     {}", total);
    println!("  Playlists:  {}", stats.len());

    if !stats.is_empty() {
        println!();
        println!("  {:<28} {:>8} {:>10}", "PLAYLIST", "VIDEOS", "MAX LIMIT");
        println!("  {}", "-".repeat(48));
        for s in &stats {
            println!(
                "  {:<28} {:>8} {:>10}",
                s.playlist_id, s.videos, s.max_limit
            );
        }
    }

    println!();
    Ok(())
}

/// Run the clear command: drop every cached record.
pub async fn run_cache_clear(config: &Config) -> Result<()> {
    let path = config.cache.resolved_path()?;
    let cache = SqliteCache::open(&path).await?;
    let removed = cache.clear().await?;
    println!("cleared {} cached videos", removed);
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
