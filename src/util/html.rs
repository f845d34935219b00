use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

/// Elements serialized without an end tag.
pub(crate) const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text is written verbatim.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Invalid selector"));

static BOLD_ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("b > a[href]").expect("Invalid selector"));

fn first_match(fragment: &str, selector: &Selector) -> Option<String> {
    Html::parse_fragment(fragment)
        .select(selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .map(str::to_owned)
}

/// `href` of the first anchor in an HTML fragment.
pub fn first_href(fragment: &str) -> Option<String> {
    first_match(fragment, &ANCHOR_SELECTOR)
}

/// `href` of the first anchor directly inside a `<b>`.
pub fn first_bold_href(fragment: &str) -> Option<String> {
    first_match(fragment, &BOLD_ANCHOR_SELECTOR)
}

/// `href` of the first anchor whose text is exactly `label`.
pub fn labelled_href(fragment: &str, label: &str) -> Option<String> {
    Html::parse_fragment(fragment)
        .select(&ANCHOR_SELECTOR)
        .find(|a| a.text().collect::<String>().trim() == label)
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_owned())
}

/// Replaces every `<a>` element with its children, keeping the anchor text.
///
/// The fragment is parsed and re-serialized, so the output is normalized
/// HTML (lowercase names, quoted attributes).
pub fn unwrap_anchors(fragment: &str) -> String {
    let document = Html::parse_fragment(fragment);
    let mut out = String::with_capacity(fragment.len());
    write_unwrapped(document.root_element(), &mut out);
    out
}

fn write_unwrapped(element: ElementRef<'_>, out: &mut String) {
    let raw = RAW_TEXT_ELEMENTS.contains(&element.value().name());
    for child in element.children() {
        match child.value() {
            Node::Text(text) if raw => out.push_str(text),
            Node::Text(text) => escape_into(text, false, out),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Element(el) if el.name() == "a" => {
                if let Some(anchor) = ElementRef::wrap(child) {
                    write_unwrapped(anchor, out);
                }
            }
            Node::Element(el) => {
                let Some(inner) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = el.name();
                out.push('<');
                out.push_str(name);
                for (attr, value) in el.attrs() {
                    out.push(' ');
                    out.push_str(attr);
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&name) {
                    continue;
                }
                write_unwrapped(inner, out);
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => {}
        }
    }
}

pub(crate) fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
