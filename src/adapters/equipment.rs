//! Equipment listings (printers, routers, bucket trucks).

use federated_search_core::models::SourceType;
use federated_search_core::store::Record;

use super::{excerpt, first_text, pick, place, text, Normalized, SourceProfile};

pub static PROFILE: SourceProfile = SourceProfile {
    source_type: SourceType::Equipment,
    collection: "equipment",
    searchable: &["name", "brand", "model", "category", "description"],
    tag_field: Some("category"),
    location_fields: &["city", "state"],
    date_field: None,
    popularity_field: Some("views"),
    link_segment: "equipment",
    exclude: None,
    normalize,
};

fn normalize(record: &Record) -> Normalized {
    let title = text(record, "name").unwrap_or_else(|| {
        [text(record, "brand"), text(record, "model")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    });
    let mut description = excerpt(&first_text(record, &["description"]), 200);
    if let Some(place) = place(record) {
        description = if description.is_empty() {
            place
        } else {
            format!("{} · {}", description, place)
        };
    }
    Normalized {
        title,
        description,
        metadata: pick(
            record,
            &[
                "brand",
                "model",
                "category",
                "condition",
                "price",
                "city",
                "state",
                "views",
                "created_at",
            ],
        ),
    }
}
