use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use super::TextEncoding;
use crate::feed::{Feed, Item};
use crate::util::strip_control_chars;

const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";

/// Renders an RSS 2.0 document with `content:encoded` bodies.
pub fn render(feed: &Feed, indent: bool, encoding: TextEncoding) -> Result<String> {
    let mut writer = if indent {
        Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2)
    } else {
        Writer::new(Cursor::new(Vec::new()))
    };

    if encoding == TextEncoding::Utf8 {
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .context("Failed to write XML declaration")?;
    }

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:content", CONTENT_NS));
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    write_optional(&mut writer, "title", feed.title.as_deref())?;
    write_optional(&mut writer, "description", feed.description.as_deref())?;
    write_optional(&mut writer, "link", feed.link.as_deref())?;

    for item in &feed.items {
        write_item(&mut writer, item)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).context("RSS output is not valid UTF-8")
}

fn write_item(writer: &mut Writer<Cursor<Vec<u8>>>, item: &Item) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .context("Failed to write item element")?;

    write_optional(writer, "title", item.title.as_deref())?;
    write_optional(writer, "link", Some(item.link.as_str()).filter(|l| !l.is_empty()))?;
    write_optional(writer, "description", item.description.as_deref())?;
    write_optional(writer, "content:encoded", item.content.as_deref())?;

    let pub_date = item.published.or(item.updated).map(|t| t.to_rfc2822());
    write_optional(writer, "pubDate", pub_date.as_deref())?;

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .context("Failed to write item end")?;
    Ok(())
}

/// `<name>text</name>`, skipped when there is no text.
fn write_optional(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: Option<&str>,
) -> Result<()> {
    let Some(text) = text else {
        return Ok(());
    };

    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(&strip_control_chars(text))))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}
