//! Article extraction: turns a fetched page into the HTML of its main content.

mod readability;

pub use readability::Readability;

/// Extracts the main content of an HTML page.
pub trait ContentExtractor: Send + Sync {
    /// Returns the cleaned article HTML, or `None` when the page holds no
    /// recognizable article. `selector`, when given, names the content
    /// element directly.
    fn extract(
        &self,
        html: &str,
        base_url: &str,
        encoding: Option<&str>,
        selector: Option<&str>,
    ) -> Option<String>;
}
