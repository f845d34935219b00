use anyhow::Result;

use super::timestamp;
use crate::feed::Feed;

const HEADER: [&str; 6] = ["title", "link", "desc", "content", "time", "updated"];

/// Renders one row per item, RFC 4180 style (CRLF line ends, quoted fields
/// when needed).
pub fn render(feed: &Feed) -> Result<String> {
    let mut out = String::new();
    write_row(&mut out, HEADER.iter().copied());

    for item in &feed.items {
        let time = timestamp(item.published).unwrap_or_default();
        let updated = timestamp(item.updated).unwrap_or_default();
        write_row(
            &mut out,
            [
                item.title.as_deref().unwrap_or(""),
                item.link.as_str(),
                item.description.as_deref().unwrap_or(""),
                item.content.as_deref().unwrap_or(""),
                time.as_str(),
                updated.as_str(),
            ]
            .into_iter(),
        );
    }

    Ok(out)
}

fn write_row<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\r', '\n']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}
