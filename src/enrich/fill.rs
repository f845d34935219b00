use std::time::Duration;

use super::Enricher;
use crate::feed::fetcher::HTML_MIME_TYPES;
use crate::feed::{CachePolicy, FetchError, FetchRequest, Item};

/// Cached article pages younger than this are reused without revalidation.
const ITEM_MIN_FRESHNESS: Duration = Duration::from_secs(24 * 60 * 60);

/// Pages worth running the extractor on: HTML, plus plain text.
fn is_extractable(content_type: &str) -> bool {
    HTML_MIME_TYPES.contains(&content_type) || content_type == "text/plain"
}

/// Result of the content-fill pass.
#[derive(Debug)]
pub enum FillOutcome {
    /// Nothing more can be done for this item (enriched or not).
    Done,
    /// The article page could not be fetched.
    Failed(FetchError),
}

impl Enricher<'_> {
    /// Downloads the item's page and replaces its content with the extracted
    /// article. `fast` restricts the download to the cache.
    pub async fn fill(&self, item: &mut Item, fast: bool) -> FillOutcome {
        if !item.has_link() {
            return FillOutcome::Done;
        }

        let policy = if fast {
            CachePolicy::Offline
        } else {
            CachePolicy::from_options(self.options)
        };

        let request = FetchRequest {
            min_freshness: ITEM_MIN_FRESHNESS,
            ..FetchRequest::get(&item.link, policy, self.timeout)
        };

        let response = match self.fetcher.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %item.link, error = %e, fast, "Item fetch failed");
                return FillOutcome::Failed(e);
            }
        };

        if !is_extractable(&response.content_type) {
            tracing::debug!(url = %item.link, content_type = %response.content_type, "Non-text page");
            return FillOutcome::Done;
        }

        if response.body.is_empty() {
            tracing::debug!(url = %item.link, "Empty page");
            return FillOutcome::Done;
        }

        let extracted = self.extractor.extract(
            &response.text(),
            &response.url,
            response.encoding.as_deref(),
            self.options.xpath.as_deref().filter(|s| !s.is_empty()),
        );

        if let Some(content) = extracted {
            item.content = Some(content);
        }

        if self.options.resolve {
            item.link = response.url;
        }

        FillOutcome::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::enrich::test_support::{EchoExtractor, StubFetcher};
    use crate::feed::FetchResponse;
    use pretty_assertions::assert_eq;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn linked(link: &str) -> Item {
        Item {
            link: link.into(),
            content: Some("original".into()),
            ..Item::default()
        }
    }

    async fn fill(
        options: &Options,
        fetcher: &StubFetcher,
        item: &mut Item,
        fast: bool,
    ) -> FillOutcome {
        Enricher::new(options, "https://example.com/", fetcher, &EchoExtractor, TIMEOUT)
            .fill(item, fast)
            .await
    }

    #[test]
    fn test_extractable_types() {
        for content_type in ["text/html", "application/xhtml+xml", "application/xml", "text/plain"] {
            assert!(is_extractable(content_type), "{content_type}");
        }
        assert!(!is_extractable("image/png"));
        assert!(!is_extractable("application/pdf"));
    }

    #[tokio::test]
    async fn test_html_page_replaces_content() {
        let fetcher = StubFetcher::default().with_page("https://example.com/a", "text/html", "<p>A</p>");
        let mut item = linked("https://example.com/a");

        let outcome = fill(&Options::default(), &fetcher, &mut item, false).await;

        assert!(matches!(outcome, FillOutcome::Done));
        assert_eq!(item.content.as_deref(), Some("<extracted><p>A</p></extracted>"));
        assert_eq!(fetcher.seen(), vec![("https://example.com/a".to_owned(), CachePolicy::Default)]);
    }

    #[tokio::test]
    async fn test_fast_mode_is_cache_only() {
        let fetcher = StubFetcher::default();
        let mut item = linked("https://example.com/missing");

        let outcome = fill(&Options::default(), &fetcher, &mut item, true).await;

        assert!(matches!(outcome, FillOutcome::Failed(_)));
        assert_eq!(item.content.as_deref(), Some("original"));
        assert_eq!(fetcher.seen()[0].1, CachePolicy::Offline);
    }

    #[tokio::test]
    async fn test_policy_follows_options() {
        let fetcher = StubFetcher::default();
        let force = Options {
            force: true,
            ..Options::default()
        };
        let cache = Options {
            cache: true,
            ..Options::default()
        };

        fill(&force, &fetcher, &mut linked("https://example.com/1"), false).await;
        fill(&cache, &fetcher, &mut linked("https://example.com/2"), false).await;

        let policies: Vec<CachePolicy> = fetcher.seen().into_iter().map(|(_, p)| p).collect();
        assert_eq!(policies, vec![CachePolicy::Refresh, CachePolicy::Offline]);
    }

    #[tokio::test]
    async fn test_non_text_and_empty_pages_are_done() {
        let fetcher = StubFetcher::default()
            .with_page("https://example.com/img", "image/png", "PNG")
            .with_page("https://example.com/empty", "text/html", "");

        for link in ["https://example.com/img", "https://example.com/empty"] {
            let mut item = linked(link);
            let outcome = fill(&Options::default(), &fetcher, &mut item, false).await;
            assert!(matches!(outcome, FillOutcome::Done));
            assert_eq!(item.content.as_deref(), Some("original"));
        }
    }

    #[tokio::test]
    async fn test_no_link_is_done_without_fetch() {
        let fetcher = StubFetcher::default();
        let mut item = Item::default();

        let outcome = fill(&Options::default(), &fetcher, &mut item, false).await;

        assert!(matches!(outcome, FillOutcome::Done));
        assert!(fetcher.seen().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_and_xpath() {
        let mut fetcher = StubFetcher::default();
        fetcher.pages.insert(
            "https://short.example/x".into(),
            FetchResponse {
                url: "https://example.com/final".into(),
                body: b"page".to_vec(),
                encoding: Some("utf-8".into()),
                content_type: "text/plain".into(),
            },
        );
        let options = Options {
            resolve: true,
            xpath: Some("div.body".into()),
            ..Options::default()
        };
        let mut item = linked("https://short.example/x");

        fill(&options, &fetcher, &mut item, false).await;

        assert_eq!(item.link, "https://example.com/final");
        assert_eq!(item.content.as_deref(), Some("[div.body]page"));
    }
}
