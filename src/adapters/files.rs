//! Shared files: price sheets, templates, manuals.

use federated_search_core::models::SourceType;
use federated_search_core::store::Record;

use super::{excerpt, first_text, pick, Normalized, SourceProfile};

pub static PROFILE: SourceProfile = SourceProfile {
    source_type: SourceType::Files,
    collection: "files",
    searchable: &["title", "filename", "description", "tags"],
    tag_field: Some("tags"),
    location_fields: &[],
    date_field: Some("created_at"),
    popularity_field: Some("downloads"),
    link_segment: "files",
    exclude: None,
    normalize,
};

fn normalize(record: &Record) -> Normalized {
    Normalized {
        title: first_text(record, &["title", "filename"]),
        description: excerpt(&first_text(record, &["description"]), 240),
        metadata: pick(
            record,
            &[
                "filename",
                "file_type",
                "size_bytes",
                "tags",
                "downloads",
                "uploader_name",
                "created_at",
            ],
        ),
    }
}
