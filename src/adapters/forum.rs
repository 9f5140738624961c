//! Forum threads.

use federated_search_core::models::SourceType;
use federated_search_core::store::Record;

use super::{excerpt, first_text, pick, Normalized, SourceProfile};

pub static PROFILE: SourceProfile = SourceProfile {
    source_type: SourceType::ForumPosts,
    collection: "forum_threads",
    searchable: &["title", "body", "tags", "author_name"],
    tag_field: Some("tags"),
    location_fields: &[],
    date_field: Some("created_at"),
    popularity_field: Some("views"),
    link_segment: "forum",
    exclude: None,
    normalize,
};

fn normalize(record: &Record) -> Normalized {
    Normalized {
        title: first_text(record, &["title"]),
        description: excerpt(&first_text(record, &["body"]), 200),
        metadata: pick(
            record,
            &["author_name", "reply_count", "views", "tags", "category", "created_at"],
        ),
    }
}
