//! Request orchestration: fetch, parse, budgeted gather, format.
//!
//! The gather pass visits items one at a time and checks two caps before
//! doing any work on an item:
//!
//! - past the **hard** cap (item count or seconds) the item is dropped outright
//! - past the **soft** cap its content may only come from cache, and it is
//!   dropped if the cache has nothing
//!
//! Caps are checked between items; an in-flight fetch is bounded by the fetch
//! timeout alone.
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{Config, Limits, Options, Order};
use crate::content::{ContentExtractor, Readability};
use crate::enrich::{Enricher, FillOutcome, ItemOutcome, RemovalReason};
use crate::error::PipelineError;
use crate::feed::discovery::alternate_feed;
use crate::feed::{
    CacheHandle, CachePolicy, DefaultParser, Feed, FeedParser, FetchError, FetchRequest, Fetcher,
    HttpFetcher, Item, ParseError, Ruleset,
};
use crate::format::{format_output, validate_callback, TextEncoding};

/// On a failed feed fetch, a cached copy younger than this is served instead.
const FEED_MAX_FRESHNESS: Duration = Duration::from_secs(60 * 60);

/// An item-count cap and a time cap; negative values disable a test.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cap {
    items: i64,
    time_secs: f64,
}

impl Cap {
    /// `index` is 1-based, `elapsed` is seconds since the gather started.
    fn exceeded(&self, index: i64, elapsed: f64) -> bool {
        (self.time_secs >= 0.0 && elapsed > self.time_secs)
            || (self.items >= 0 && index > self.items)
    }
}

/// The full-text pipeline with its collaborators.
///
/// Holds no per-request state; one instance serves any number of requests.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn FeedParser>,
    extractor: Arc<dyn ContentExtractor>,
    limits: Limits,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn FeedParser>,
        extractor: Arc<dyn ContentExtractor>,
        limits: Limits,
    ) -> Self {
        Self {
            fetcher,
            parser,
            extractor,
            limits,
        }
    }

    /// The production pipeline: reqwest fetcher over `cache`, feed-rs parser
    /// and the readability extractor.
    pub fn from_config(config: &Config, cache: CacheHandle) -> Result<Self, FetchError> {
        Ok(Self::new(
            Arc::new(HttpFetcher::new(config, cache)?),
            Arc::new(DefaultParser),
            Arc::new(Readability),
            config.limits.clone(),
        ))
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Downloads and parses the feed at `url`.
    ///
    /// Returns the final URL (after redirects and feed discovery) with the
    /// parsed feed. Without custom rules, an HTML page advertising an
    /// alternate feed is replaced by that feed.
    pub async fn fetch_feed(
        &self,
        url: &str,
        options: &Options,
    ) -> Result<(String, Feed), PipelineError> {
        let custom_rules = options.has_custom_rules();
        let ruleset = Ruleset::from_options(options)?;

        let request = FetchRequest {
            url,
            post: options.post.as_deref().filter(|p| !p.is_empty()),
            follow_redirects: !custom_rules,
            policy: CachePolicy::from_options(options),
            min_freshness: self.limits.freshness(),
            max_freshness: Some(FEED_MAX_FRESHNESS),
            timeout: self.limits.timeout(),
        };

        let response = self.fetcher.fetch(&request).await?;
        tracing::debug!(
            url = %response.url,
            content_type = %response.content_type,
            bytes = response.body.len(),
            "Fetched feed"
        );

        let parsed = self.parser.parse(
            &response.body,
            response.encoding.as_deref(),
            &response.url,
            ruleset.as_ref(),
        );

        match parsed {
            Ok(feed) => Ok((response.url, feed)),
            Err(ParseError::NotAFeed(reason)) if !custom_rules => {
                let Some(alternate) = alternate_feed(&response) else {
                    tracing::debug!(url = %response.url, reason = %reason, "Not a feed");
                    return Err(ParseError::NotAFeed(reason).into());
                };

                tracing::debug!(from = %response.url, to = %alternate, "Following alternate feed");
                let request = FetchRequest {
                    url: &alternate,
                    post: None,
                    ..request
                };
                let response = self.fetcher.fetch(&request).await?;
                let feed = self.parser.parse(
                    &response.body,
                    response.encoding.as_deref(),
                    &response.url,
                    None,
                )?;
                Ok((response.url, feed))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Orders, budgets and enriches the items of `feed`.
    ///
    /// Surviving items come out in visiting order; removed items are gone.
    pub async fn gather(&self, feed: Feed, feed_url: &str, options: &Options) -> Feed {
        let start = Instant::now();
        let hard = Cap {
            items: self.limits.hard_items,
            time_secs: self.limits.hard_time_secs,
        };
        let soft = Cap {
            items: self.limits.soft_items,
            time_secs: if options.cache {
                0.0
            } else {
                self.limits.soft_time_secs
            },
        };

        let Feed {
            title,
            description,
            link,
            items,
        } = feed;
        let total = items.len();
        let ordered = order_items(items, options.order, Utc::now());

        let enricher = Enricher::new(
            options,
            feed_url,
            self.fetcher.as_ref(),
            self.extractor.as_ref(),
            self.limits.timeout(),
        );

        let mut kept = Vec::with_capacity(ordered.len() + 1);
        for (i, item) in ordered.into_iter().enumerate() {
            let index = i as i64 + 1;
            match visit(&enricher, item, index, start, hard, soft).await {
                ItemOutcome::Kept(item) => kept.push(item),
                ItemOutcome::Removed(reason) => {
                    tracing::debug!(index, reason = ?reason, "Item removed");
                }
            }
        }

        if options.ad {
            kept.push(ad_item());
        }

        tracing::info!(
            url = %feed_url,
            total,
            kept = kept.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Gathered feed"
        );

        Feed {
            title,
            description,
            link,
            items: kept,
        }
    }

    /// Renders a gathered feed.
    pub fn format(
        &self,
        feed: &Feed,
        options: &Options,
        encoding: TextEncoding,
    ) -> Result<String, PipelineError> {
        format_output(feed, options, encoding)
    }

    /// Runs one full request: fetch, gather, format.
    ///
    /// A bad JSONP callback fails before anything is fetched.
    pub async fn process(
        &self,
        url: &str,
        options: &Options,
        encoding: TextEncoding,
    ) -> Result<String, PipelineError> {
        if let Some(callback) = options.callback.as_deref().filter(|c| !c.is_empty()) {
            validate_callback(callback)?;
        }

        let (final_url, feed) = self.fetch_feed(url, options).await?;
        let feed = self.gather(feed, &final_url, options).await;
        self.format(&feed, options, encoding)
    }
}

/// Runs one item through the caps and the enrichment passes.
async fn visit(
    enricher: &Enricher<'_>,
    item: Item,
    index: i64,
    start: Instant,
    hard: Cap,
    soft: Cap,
) -> ItemOutcome {
    if hard.exceeded(index, start.elapsed().as_secs_f64()) {
        return ItemOutcome::Removed(RemovalReason::HardCap);
    }

    let mut item = match enricher.before(item) {
        ItemOutcome::Kept(item) => item,
        removed => return removed,
    };

    enricher.fix(&mut item);

    if !enricher.options().proxy {
        if soft.exceeded(index, start.elapsed().as_secs_f64()) {
            if let FillOutcome::Failed(_) = enricher.fill(&mut item, true).await {
                return ItemOutcome::Removed(RemovalReason::FillFailed);
            }
        } else {
            // Live failures keep the item as it is
            enricher.fill(&mut item, false).await;
        }
    }

    enricher.after(&mut item);
    ItemOutcome::Kept(item)
}

/// Visiting order of the items.
///
/// `newest`/`oldest` sort on updated, else published, else `now`; the sort is
/// stable so ties keep feed order (reversed for `newest`).
fn order_items(mut items: Vec<Item>, order: Order, now: DateTime<Utc>) -> Vec<Item> {
    match order {
        Order::First => {}
        Order::Last => items.reverse(),
        Order::Newest | Order::Oldest => {
            items.sort_by_key(|item| item.timestamp().unwrap_or(now));
            if order == Order::Newest {
                items.reverse();
            }
        }
    }
    items
}

fn ad_item() -> Item {
    Item {
        title: Some("Are you hungry?".to_owned()),
        description: Some("Eat some Galler chocolate :)".to_owned()),
        link: "http://www.galler.com/".to_owned(),
        published: Utc.with_ymd_and_hms(2013, 10, 5, 22, 42, 0).single(),
        ..Item::default()
    }
}
