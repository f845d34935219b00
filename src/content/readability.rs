use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use url::Url;

use super::ContentExtractor;
use crate::util::{escape_into, VOID_ELEMENTS};

/// CSS selectors targeting main article content across common blog platforms.
const TARGET_SELECTORS: &str =
    "article, .entry-content, .post-content, .article-content, .post-body, main .content, main";

/// Pages whose best candidate carries less text than this hold no article.
const MIN_CONTENT_LEN: usize = 200;

/// Dropped together with everything inside them.
const STRIPPED_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "iframe", "form"];

static TARGET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(TARGET_SELECTORS).expect("Invalid selector"));

static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("Invalid selector"));

/// Heuristic article extractor.
///
/// Picks the article container with the most text, falling back to the
/// element holding the most paragraph text, then re-serializes it without
/// scripts, styles, embeds and forms, with `href`/`src` made absolute.
#[derive(Debug, Clone, Copy, Default)]
pub struct Readability;

impl ContentExtractor for Readability {
    fn extract(
        &self,
        html: &str,
        base_url: &str,
        encoding: Option<&str>,
        selector: Option<&str>,
    ) -> Option<String> {
        let document = Html::parse_document(html);
        let base = Url::parse(base_url).ok();

        let element = match selector.filter(|s| !s.trim().is_empty()) {
            Some(css) => match Selector::parse(css) {
                Ok(selector) => document.select(&selector).next()?,
                Err(e) => {
                    tracing::warn!(selector = %css, error = %e, "Ignoring invalid content selector");
                    best_candidate(&document)?
                }
            },
            None => best_candidate(&document)?,
        };

        let mut out = String::new();
        write_children(element, base.as_ref(), &mut out);
        let out = out.trim().to_owned();

        tracing::trace!(
            url = %base_url,
            encoding = ?encoding,
            bytes = out.len(),
            "Extracted article"
        );
        (!out.is_empty()).then_some(out)
    }
}

fn best_candidate(document: &Html) -> Option<ElementRef<'_>> {
    let containers = document
        .select(&TARGET)
        .map(|el| (el, visible_text_len(el)));

    let (element, len) = match first_max(containers) {
        Some((el, len)) if len >= MIN_CONTENT_LEN => (el, len),
        _ => first_max(paragraph_parents(document).into_iter())?,
    };

    (len >= MIN_CONTENT_LEN).then_some(element)
}

/// Parents of `<p>` elements, scored by the paragraph text they hold.
fn paragraph_parents(document: &Html) -> Vec<(ElementRef<'_>, usize)> {
    let mut scores: Vec<(ElementRef<'_>, usize)> = Vec::new();

    for paragraph in document.select(&PARAGRAPH) {
        let Some(parent) = paragraph.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let len = visible_text_len(paragraph);
        match scores.iter_mut().find(|(el, _)| *el == parent) {
            Some(entry) => entry.1 += len,
            None => scores.push((parent, len)),
        }
    }

    scores
}

/// The highest-scored entry; the earliest one wins ties.
fn first_max<'a>(
    scored: impl Iterator<Item = (ElementRef<'a>, usize)>,
) -> Option<(ElementRef<'a>, usize)> {
    scored.fold(None, |best, (el, len)| match best {
        Some((_, best_len)) if best_len >= len => best,
        _ => Some((el, len)),
    })
}

fn is_stripped(element: &ElementRef<'_>) -> bool {
    STRIPPED_ELEMENTS.contains(&element.value().name())
}

/// Characters of non-whitespace-trimmed text outside stripped elements.
fn visible_text_len(element: ElementRef<'_>) -> usize {
    element
        .children()
        .map(|child| match child.value() {
            Node::Text(text) => text.trim().chars().count(),
            Node::Element(_) => ElementRef::wrap(child)
                .filter(|el| !is_stripped(el))
                .map_or(0, visible_text_len),
            _ => 0,
        })
        .sum()
}

fn write_children(element: ElementRef<'_>, base: Option<&Url>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_into(text, false, out),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    write_element(el, base, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, base: Option<&Url>, out: &mut String) {
    if is_stripped(&element) {
        return;
    }

    let name = element.value().name();
    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        match attr {
            "href" | "src" => escape_into(&absolutize(value, base), true, out),
            _ => escape_into(value, true, out),
        }
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    write_children(element, base, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn absolutize(link: &str, base: Option<&Url>) -> String {
    base.and_then(|b| b.join(link.trim()).ok())
        .map(String::from)
        .unwrap_or_else(|| link.to_owned())
}
