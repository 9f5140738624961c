//! Trade shows, workshops and meetups.

use federated_search_core::models::SourceType;
use federated_search_core::store::Record;

use super::{excerpt, first_text, pick, place, Normalized, SourceProfile};

pub static PROFILE: SourceProfile = SourceProfile {
    source_type: SourceType::Events,
    collection: "events",
    searchable: &["title", "description", "location", "city", "state"],
    tag_field: Some("tags"),
    location_fields: &["city", "state", "location"],
    date_field: Some("start_date"),
    popularity_field: Some("attendee_count"),
    link_segment: "events",
    exclude: None,
    normalize,
};

fn normalize(record: &Record) -> Normalized {
    let mut description = excerpt(&first_text(record, &["description"]), 200);
    let venue = super::text(record, "location").or_else(|| place(record));
    if let Some(venue) = venue {
        description = if description.is_empty() {
            venue
        } else {
            format!("{} · {}", venue, description)
        };
    }
    Normalized {
        title: first_text(record, &["title"]),
        description,
        metadata: pick(
            record,
            &[
                "start_date",
                "end_date",
                "location",
                "city",
                "state",
                "attendee_count",
                "organizer_name",
                "created_at",
            ],
        ),
    }
}
