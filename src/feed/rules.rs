//! Custom extraction rules: scrape an arbitrary page into a [`Feed`].
//!
//! Rules are CSS selectors. A rule `"<selector>"` yields the text of the first
//! match, `"<selector>@<attr>"` one of its attributes, and `"."` (or an empty
//! selector, as in `"@href"`) addresses the element the rule is applied to.
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use super::model::{Feed, Item};
use super::parser::ParseError;
use crate::config::Options;

const DEFAULT_TITLE: &str = "head > title";
const DEFAULT_DESC: &str = "head > meta[name=description]@content";
const DEFAULT_ITEM_TITLE: &str = ".";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    Html,
    /// Lenient markup: parsed as a fragment so unknown elements survive.
    Xml,
}

/// One compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    selector: Option<Selector>,
    attr: Option<String>,
}

impl Rule {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let (selector, attr) = match source.rsplit_once('@') {
            Some((selector, attr)) if !attr.trim().is_empty() => {
                (selector.trim(), Some(attr.trim().to_owned()))
            }
            _ => (source.trim(), None),
        };

        let selector = match selector {
            "" | "." => None,
            css => Some(Selector::parse(css).map_err(|e| ParseError::InvalidRule {
                rule: source.to_owned(),
                reason: e.to_string(),
            })?),
        };

        Ok(Self { selector, attr })
    }

    fn target<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match &self.selector {
            None => Some(scope),
            Some(selector) => scope.select(selector).next(),
        }
    }

    /// Attribute value, or the trimmed text of the match.
    pub fn text(&self, scope: ElementRef<'_>) -> Option<String> {
        let target = self.target(scope)?;
        let value = match &self.attr {
            Some(attr) => target.value().attr(attr)?.trim().to_owned(),
            None => collapse_whitespace(&target.text().collect::<String>()),
        };
        (!value.is_empty()).then_some(value)
    }

    /// Attribute value, or the inner HTML of the match.
    pub fn html(&self, scope: ElementRef<'_>) -> Option<String> {
        let target = self.target(scope)?;
        let value = match &self.attr {
            Some(attr) => target.value().attr(attr)?.to_owned(),
            None => target.inner_html(),
        };
        let value = value.trim().to_owned();
        (!value.is_empty()).then_some(value)
    }
}

/// The custom ruleset of one request.
#[derive(Debug, Clone)]
pub struct Ruleset {
    items: Selector,
    mode: RuleMode,
    title: Rule,
    desc: Rule,
    item_title: Rule,
    item_link: Option<Rule>,
    item_content: Option<Rule>,
    item_time: Option<Rule>,
}

impl Ruleset {
    /// Builds the ruleset from the request options; `None` when no `items`
    /// selector is configured.
    pub fn from_options(options: &Options) -> Result<Option<Self>, ParseError> {
        let Some(items) = options.items.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let mode = match options.mode.as_deref().map(str::trim) {
            None | Some("") | Some("html") => RuleMode::Html,
            Some("xml") => RuleMode::Xml,
            Some(other) => return Err(ParseError::UnsupportedMode(other.to_owned())),
        };

        let items = Selector::parse(items).map_err(|e| ParseError::InvalidRule {
            rule: items.to_owned(),
            reason: e.to_string(),
        })?;

        let optional = |rule: &Option<String>| {
            rule.as_deref()
                .filter(|s| !s.is_empty())
                .map(Rule::parse)
                .transpose()
        };
        let or_default = |rule: &Option<String>, default: &str| {
            Rule::parse(rule.as_deref().filter(|s| !s.is_empty()).unwrap_or(default))
        };

        Ok(Some(Self {
            items,
            mode,
            title: or_default(&options.title, DEFAULT_TITLE)?,
            desc: or_default(&options.desc, DEFAULT_DESC)?,
            item_title: or_default(&options.item_title, DEFAULT_ITEM_TITLE)?,
            item_link: optional(&options.item_link)?,
            item_content: optional(&options.item_content)?,
            item_time: optional(&options.item_time)?,
        }))
    }

    /// Scrapes `page` (fetched from `url`) into a feed.
    pub fn extract(&self, page: &str, url: &str) -> Feed {
        let document = match self.mode {
            RuleMode::Html => Html::parse_document(page),
            RuleMode::Xml => Html::parse_fragment(page),
        };
        let root = document.root_element();

        let items: Vec<Item> = root
            .select(&self.items)
            .map(|element| self.extract_item(element))
            .collect();

        tracing::debug!(url = %url, items = items.len(), "Extracted items with custom rules");

        Feed {
            title: self.title.text(root),
            description: self.desc.text(root),
            link: Some(url.to_owned()),
            items,
        }
    }

    fn extract_item(&self, element: ElementRef<'_>) -> Item {
        let link = match &self.item_link {
            Some(rule) => rule.text(element),
            None => default_link(element),
        };

        Item {
            link: link.unwrap_or_default(),
            title: self.item_title.text(element),
            content: self.item_content.as_ref().and_then(|rule| rule.html(element)),
            published: self
                .item_time
                .as_ref()
                .and_then(|rule| rule.text(element))
                .and_then(|raw| parse_time(&raw)),
            ..Item::default()
        }
    }
}

/// The element's own `href`, else its first linked descendant, else the
/// nearest linked ancestor.
fn default_link(element: ElementRef<'_>) -> Option<String> {
    if let Some(href) = element.value().attr("href") {
        return Some(href.trim().to_owned());
    }

    let anchor = Selector::parse("a[href]").ok()?;
    if let Some(a) = element.select(&anchor).next() {
        return a.value().attr("href").map(|h| h.trim().to_owned());
    }

    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|a| a.value().attr("href").map(|h| h.trim().to_owned()))
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
