//! Feed acquisition: the fetch and parse collaborators of the pipeline.
//!
//! - [`fetcher`] - HTTP retrieval behind the [`Fetcher`] trait, with cache policies
//! - [`cache`] - the shared response cache, created once per process
//! - [`parser`] - feed grammar parsing behind the [`FeedParser`] trait
//! - [`rules`] - custom-rule scraping of plain HTML pages
//! - [`discovery`] - `<link rel="alternate">` feed discovery
//! - [`model`] - the [`Feed`]/[`Item`] model everything else works on

pub mod cache;
pub mod discovery;
pub mod fetcher;
pub mod model;
pub mod parser;
pub mod rules;

pub use cache::CacheHandle;
pub use fetcher::{CachePolicy, FetchError, FetchRequest, FetchResponse, Fetcher, HttpFetcher};
pub use model::{Extension, Feed, Item, FEEDBURNER_NS};
pub use parser::{DefaultParser, FeedParser, ParseError};
pub use rules::Ruleset;
