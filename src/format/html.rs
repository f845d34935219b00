use anyhow::Result;

use crate::feed::{Feed, Item};
use crate::util::strip_control_chars;

/// Renders a standalone HTML page. Item content is embedded as HTML; titles,
/// links and dates are escaped.
pub fn render(feed: &Feed, indent: bool) -> Result<String> {
    let title = escape(feed.title.as_deref().unwrap_or(""));
    let mut parts = vec![
        "<!DOCTYPE html>".to_owned(),
        "<html>".to_owned(),
        format!("<head><meta charset=\"utf-8\"><title>{title}</title></head>"),
        "<body>".to_owned(),
        format!("<header><h1>{title}</h1>"),
    ];

    if let Some(desc) = feed.description.as_deref().filter(|d| !d.is_empty()) {
        parts.push(format!("<p>{}</p>", escape(desc)));
    }
    parts.push("</header>".to_owned());

    for item in &feed.items {
        parts.push(render_item(item));
    }

    parts.push("</body>".to_owned());
    parts.push("</html>".to_owned());

    Ok(parts.join(if indent { "\n" } else { "" }))
}

fn render_item(item: &Item) -> String {
    let title = escape(item.title.as_deref().unwrap_or(""));
    let heading = if item.has_link() {
        format!("<h2><a href=\"{}\">{title}</a></h2>", escape(&item.link))
    } else {
        format!("<h2>{title}</h2>")
    };

    let mut out = format!("<article>{heading}");
    if let Some(time) = item.published.or(item.updated) {
        out.push_str(&format!(
            "<time datetime=\"{}\">{}</time>",
            time.to_rfc3339(),
            time.format("%Y-%m-%d %H:%M")
        ));
    }
    if let Some(desc) = item.description.as_deref() {
        out.push_str(&format!("<div class=\"desc\">{}</div>", strip_control_chars(desc)));
    }
    if let Some(content) = item.content.as_deref() {
        out.push_str(&format!("<div class=\"content\">{}</div>", strip_control_chars(content)));
    }
    out.push_str("</article>");
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in strip_control_chars(text).chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
