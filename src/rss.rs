//! RSS 2.0 serialization.
//!
//! Renders an assembled [`ChannelFeed`] into an RSS document with
//! quick-xml. In serve mode each item carries an `<enclosure>` pointing
//! back at this server's `/watch` endpoint (which resolves the actual
//! media URL on demand); one-shot mode omits enclosures since there is no
//! server to redirect through.

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use url::Url;

use crate::models::ChannelFeed;

/// Presentation options for one rendered feed.
///
/// `format` is `Some` only when the caller explicitly overrode the
/// configured download format; only then is it propagated into enclosure
/// URLs, mirroring how the query reached us.
pub struct FeedOptions {
    pub format: Option<String>,
    pub mime_type: String,
    pub enclosure_base: Option<Url>,
}

/// Render the feed as an RSS 2.0 document.
pub fn render_rss(feed: &ChannelFeed, opts: &FeedOptions) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &feed.channel.title)?;
    text_element(&mut writer, "link", &feed.channel.channel_url())?;
    text_element(&mut writer, "description", &feed.channel.description)?;

    if let Some(thumb) = &feed.channel.thumbnail {
        writer.write_event(Event::Start(BytesStart::new("image")))?;
        text_element(&mut writer, "url", &thumb.url)?;
        text_element(&mut writer, "title", &feed.channel.title)?;
        text_element(&mut writer, "link", &feed.channel.channel_url())?;
        text_element(&mut writer, "width", &thumb.width.to_string())?;
        text_element(&mut writer, "height", &thumb.height.to_string())?;
        writer.write_event(Event::End(BytesEnd::new("image")))?;
    }

    for video in &feed.videos {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &video.title)?;
        text_element(&mut writer, "link", &video.watch_url())?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(&video.video_id)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;

        text_element(&mut writer, "pubDate", &video.published.to_rfc2822())?;
        text_element(&mut writer, "description", &video.description)?;

        if let Some(base) = &opts.enclosure_base {
            let url = enclosure_url(base, &video.video_id, opts.format.as_deref())?;
            let mut enclosure = BytesStart::new("enclosure");
            enclosure.push_attribute(("url", url.as_str()));
            // The media length is unknown until the URL is resolved.
            enclosure.push_attribute(("length", "-1"));
            enclosure.push_attribute(("type", opts.mime_type.as_str()));
            writer.write_event(Event::Empty(enclosure))?;
        }

        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner()).context("rss output was not valid utf-8")
}

fn enclosure_url(base: &Url, video_id: &str, format: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/watch", base.as_str().trim_end_matches('/')))
        .context("could not build enclosure url")?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(format) = format {
            query.append_pair("format", format);
        }
        query.append_pair("v", video_id);
    }
    Ok(url)
}

fn text_element<W: std::io::Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
