//! Member directory (owners). Internal accounts are never searchable.

use federated_search_core::models::SourceType;
use federated_search_core::store::Record;

use super::{first_text, pick, place, Normalized, SourceProfile};

/// Roles hidden from search results.
pub const HIDDEN_ROLES: &[&str] = &["admin", "superadmin", "staff"];

pub static PROFILE: SourceProfile = SourceProfile {
    source_type: SourceType::People,
    collection: "owners",
    searchable: &["name", "company", "specialties", "city", "state"],
    tag_field: Some("specialties"),
    location_fields: &["city", "state"],
    date_field: None,
    popularity_field: None,
    link_segment: "people",
    exclude: Some(("role", HIDDEN_ROLES)),
    normalize,
};

fn normalize(record: &Record) -> Normalized {
    let company = first_text(record, &["company"]);
    let description = match place(record) {
        Some(place) if !company.is_empty() => format!("{} · {}", company, place),
        Some(place) => place,
        None => company,
    };
    Normalized {
        title: first_text(record, &["name"]),
        description,
        metadata: pick(
            record,
            &["company", "specialties", "city", "state", "avatar_url", "created_at"],
        ),
    }
}
