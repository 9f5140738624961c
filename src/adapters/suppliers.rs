//! Supplier directory.

use federated_search_core::models::SourceType;
use federated_search_core::store::Record;

use super::{excerpt, first_text, pick, Normalized, SourceProfile};

pub static PROFILE: SourceProfile = SourceProfile {
    source_type: SourceType::Suppliers,
    collection: "suppliers",
    searchable: &["name", "description", "categories", "city", "state"],
    tag_field: Some("categories"),
    location_fields: &["city", "state"],
    date_field: None,
    popularity_field: None,
    link_segment: "suppliers",
    exclude: None,
    normalize,
};

fn normalize(record: &Record) -> Normalized {
    Normalized {
        title: first_text(record, &["name"]),
        description: excerpt(&first_text(record, &["description"]), 200),
        metadata: pick(
            record,
            &["categories", "city", "state", "website", "phone", "created_at"],
        ),
    }
}
