use chrono::{DateTime, Utc};

/// Namespace of the feedburner extension elements (`feedburner:origLink`).
pub const FEEDBURNER_NS: &str = "http://rssnamespace.org/feedburner/ext/1.0";

/// A parsed feed: metadata plus items in meaningful order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub items: Vec<Item>,
}

/// One feed entry.
///
/// `description` and `content` are HTML fragments. An empty `link` means the
/// entry has none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub link: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// Namespaced elements the feed grammar itself does not model.
    pub extensions: Vec<Extension>,
}

/// A namespaced element attached to an item, e.g. `feedburner:origLink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub namespace: String,
    pub name: String,
    pub value: String,
}

impl Item {
    /// Text of the first extension element `name` in `namespace`.
    pub fn extension(&self, namespace: &str, name: &str) -> Option<&str> {
        self.extensions
            .iter()
            .find(|e| e.namespace == namespace && e.name == name)
            .map(|e| e.value.as_str())
    }

    /// The timestamp used for ordering: updated, else published.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.updated.or(self.published)
    }

    pub fn has_link(&self) -> bool {
        !self.link.is_empty()
    }
}
