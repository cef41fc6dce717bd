use crate::api::{PitwallApi, or_empty};
use crate::model::{FeedItem, FeedPage};

/// One page of the news feed, an empty page when the request fails.
pub async fn load_feed(
    api: &dyn PitwallApi,
    page: u32,
    size: u32,
    series: Option<&str>,
) -> FeedPage {
    or_empty(api.feed(page, size, series).await, "feed")
}

impl FeedPage {
    pub fn has_next(&self) -> bool {
        self.number + 1 < self.total_pages
    }
}

/// Title line as printed in listings, prefixed with the item's marker when it has one.
pub fn headline(item: &FeedItem) -> String {
    match item.item_type.icon() {
        Some(icon) => format!("{} {}", icon, item.title),
        None => item.title.clone(),
    }
}
