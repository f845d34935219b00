use super::{Enricher, ItemOutcome, RemovalReason};
use crate::feed::Item;
use crate::util::unwrap_anchors;

/// Placed between description and content by `clip`.
const CLIP_SEPARATOR: &str = "<br/><br/><hr/><br/><br/>";

impl Enricher<'_> {
    /// Drops items whose title lacks the search term. A missing title never
    /// matches a non-empty term.
    pub fn before(&self, item: Item) -> ItemOutcome {
        if let Some(term) = self.options.search_term() {
            if !item.title.as_deref().unwrap_or("").contains(term) {
                tracing::debug!(title = ?item.title, term = %term, "Item filtered out");
                return ItemOutcome::Removed(RemovalReason::Filtered);
            }
        }
        ItemOutcome::Kept(item)
    }

    /// Post-processing: `clip`, then `nolink`, then `noref`.
    pub fn after(&self, item: &mut Item) {
        if self.options.clip {
            let has_both = item.description.as_deref().is_some_and(|d| !d.is_empty())
                && item.content.as_deref().is_some_and(|c| !c.is_empty());
            if has_both {
                if let (Some(desc), Some(content)) = (item.description.take(), item.content.as_mut())
                {
                    *content = format!("{desc}{CLIP_SEPARATOR}{content}");
                }
            }
        }

        if self.options.nolink {
            if let Some(content) = item.content.as_mut() {
                *content = unwrap_anchors(content);
            }
        }

        if self.options.noref {
            item.link.clear();
        }
    }
}
