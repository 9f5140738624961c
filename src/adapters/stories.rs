//! Member stories and project write-ups.

use federated_search_core::models::SourceType;
use federated_search_core::store::Record;

use super::{excerpt, first_text, pick, Normalized, SourceProfile};

pub static PROFILE: SourceProfile = SourceProfile {
    source_type: SourceType::Stories,
    collection: "stories",
    searchable: &["title", "summary", "content", "tags"],
    tag_field: Some("tags"),
    location_fields: &[],
    date_field: Some("created_at"),
    popularity_field: Some("views"),
    link_segment: "stories",
    exclude: None,
    normalize,
};

fn normalize(record: &Record) -> Normalized {
    Normalized {
        title: first_text(record, &["title"]),
        description: excerpt(&first_text(record, &["summary", "content"]), 240),
        metadata: pick(
            record,
            &["author_name", "views", "likes", "tags", "cover_image", "created_at"],
        ),
    }
}
