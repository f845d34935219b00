use regex::Regex;
use std::sync::LazyLock;

use super::unwrap::{decode_feedsportal, unwrap_redirects};
use super::Enricher;
use crate::feed::{Item, FEEDBURNER_NS};
use crate::util::{first_bold_href, first_href, is_upper, labelled_href, title_case};

/// Titles longer than this that are all caps get title-cased.
const SHOUTING_TITLE_LEN: usize = 20;

/// Host whose entries carry the real destination in a `[link]` anchor.
const LINK_AGGREGATOR_HOST: &str = "www.reddit.com";

static WIKIPEDIA_HIGHLIGHTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^http.*://.*\.wikipedia\.org/w/api\.php..*&feedformat=atom$")
        .expect("Invalid regex")
});

impl Enricher<'_> {
    /// Normalizes an item: title casing, then link resolution and unwrapping.
    ///
    /// Items without a link only get their title fixed.
    pub fn fix(&self, item: &mut Item) {
        if let Some(title) = item.title.as_mut() {
            if title.chars().count() > SHOUTING_TITLE_LEN && is_upper(title) {
                *title = title_case(title);
            }
        }

        if !item.has_link() {
            tracing::trace!("Item has no link");
            return;
        }

        if WIKIPEDIA_HIGHLIGHTS_RE.is_match(self.feed_url) {
            if let Some(href) = item.description.as_deref().and_then(first_bold_href) {
                item.link = href;
            }
        }

        if self.options.firstlink {
            let source = [item.description.as_deref(), item.content.as_deref()]
                .into_iter()
                .flatten()
                .find(|html| !html.is_empty());
            if let Some(href) = source.and_then(first_href) {
                item.link = href;
            }
        }

        item.link = self.resolve(&item.link);
        item.link = unwrap_redirects(&item.link);

        if let Some(original) = item
            .extension(FEEDBURNER_NS, "origLink")
            .filter(|link| !link.is_empty())
            .map(str::to_owned)
        {
            item.link = original;
        }

        if let Some(decoded) = decode_feedsportal(&item.link) {
            tracing::debug!(url = %decoded, "Decoded feedsportal link");
            item.link = decoded;
        }

        if self.feed_host().as_deref() == Some(LINK_AGGREGATOR_HOST) {
            if let Some(href) = item
                .content
                .as_deref()
                .and_then(|c| labelled_href(c, "[link]"))
            {
                item.link = href;
            }
        }
    }

    /// Makes a link absolute: through the forwarding proxy when one is
    /// configured, else against the feed URL.
    fn resolve(&self, link: &str) -> String {
        if let Some(proxy) = &self.web_proxy {
            return proxy.rewrite_link(link);
        }

        match url::Url::parse(self.feed_url).and_then(|base| base.join(link)) {
            Ok(resolved) => resolved.into(),
            Err(_) => link.to_owned(),
        }
    }

    fn feed_host(&self) -> Option<String> {
        url::Url::parse(self.feed_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
    }
}
