//! Per-item enrichment.
//!
//! Every item that survives the hard cap goes through four passes, always in
//! this order:
//!
//! 1. [`Enricher::before`] - title search filter, may remove the item
//! 2. [`Enricher::fix`] - title casing, link resolution and unwrapping
//! 3. [`Enricher::fill`] - full content download and extraction
//! 4. [`Enricher::after`] - clip, nolink and noref post-processing
//!
//! Removal is a value ([`ItemOutcome::Removed`]) threaded back to the gather
//! loop, never an error.

mod fill;
mod filter;
mod fix;
mod unwrap;

use std::time::Duration;

use crate::config::Options;
use crate::content::ContentExtractor;
use crate::feed::{Fetcher, Item};
use crate::proxy::WebProxy;

pub use fill::FillOutcome;
pub use unwrap::decode_feedsportal;

/// Why an item was left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// Visited after the hard item or time cap was exceeded.
    HardCap,
    /// Title lacks the search term.
    Filtered,
    /// Past the soft cap and not available from cache.
    FillFailed,
}

/// Result of running an item through the passes that may drop it.
#[derive(Debug)]
pub enum ItemOutcome {
    Kept(Item),
    Removed(RemovalReason),
}

/// The enrichment passes of one request.
pub struct Enricher<'a> {
    options: &'a Options,
    /// Final URL of the feed; base for link resolution and site rules.
    feed_url: &'a str,
    web_proxy: Option<WebProxy>,
    fetcher: &'a dyn Fetcher,
    extractor: &'a dyn ContentExtractor,
    timeout: Duration,
}

impl<'a> Enricher<'a> {
    pub fn new(
        options: &'a Options,
        feed_url: &'a str,
        fetcher: &'a dyn Fetcher,
        extractor: &'a dyn ContentExtractor,
        timeout: Duration,
    ) -> Self {
        Self {
            options,
            feed_url,
            web_proxy: options.web_proxy_prefix().map(WebProxy::parse),
            fetcher,
            extractor,
            timeout,
        }
    }

    pub fn options(&self) -> &Options {
        self.options
    }
}
