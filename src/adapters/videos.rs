//! Video library.

use federated_search_core::models::SourceType;
use federated_search_core::store::Record;

use super::{excerpt, first_text, pick, Normalized, SourceProfile};

pub static PROFILE: SourceProfile = SourceProfile {
    source_type: SourceType::Videos,
    collection: "videos",
    searchable: &["title", "description", "tags"],
    tag_field: Some("tags"),
    location_fields: &[],
    date_field: Some("created_at"),
    popularity_field: Some("views"),
    link_segment: "videos",
    exclude: None,
    normalize,
};

fn normalize(record: &Record) -> Normalized {
    Normalized {
        title: first_text(record, &["title"]),
        description: excerpt(&first_text(record, &["description"]), 200),
        metadata: pick(
            record,
            &[
                "duration_secs",
                "views",
                "thumbnail_url",
                "author_name",
                "tags",
                "created_at",
            ],
        ),
    }
}
