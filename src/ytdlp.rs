//! Playable media URL resolution through an external downloader command.
//!
//! Podcast clients expect an enclosure to point at a media file, but the
//! direct URLs YouTube serves expire quickly. Instead of embedding one,
//! the feed links enclosures back to this server's `/watch` endpoint,
//! which shells out to yt-dlp (or a compatible command) at click time and
//! redirects to whatever URL it extracts.

use anyhow::{bail, Context, Result};
use tokio::process::Command;

/// Ask the configured downloader for the direct media URL of a video.
pub async fn resolve_media_url(command: &str, format: &str, video_id: &str) -> Result<String> {
    let watch = format!("https://youtube.com/watch?v={video_id}");
    let output = Command::new(command)
        .arg("--get-url")
        .arg(format!("--format={format}"))
        .arg(&watch)
        .output()
        .await
        .with_context(|| format!("running {command}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{command} failed for {watch}: {}", stderr.trim());
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        bail!("{command} produced no url for {watch}");
    }
    Ok(url)
}
