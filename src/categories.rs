//! The closed category schema for market-data records.
//!
//! This list is the single source of truth: the extractor enumerates it when
//! prompting, the collector buckets snippets by it, the refiner and merge
//! stages iterate it, and the record writer refuses any column outside it.
//! Downstream consumers depend on the exact key names; do not rename entries.

/// One market-data category.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    /// Stable identifier, also the column name in the market-data table.
    pub name: &'static str,
    /// Human- and LLM-facing description. `[hotelName]` is substituted with
    /// the hotel's display name before prompting.
    pub description: &'static str,
    /// Extra extraction instructions for this category, if any.
    pub capture_guide: Option<&'static str>,
    /// Extra consolidation instructions for this category, if any.
    pub merge_guide: Option<&'static str>,
}

/// Catch-all category; it has no field-specific prioritization rules.
pub const OTHER: &str = "other";

/// Derived column holding the structured form of `other`. Not a category:
/// it is never prompted for, only written alongside `other`.
pub const OTHER_STRUCTURED: &str = "other_structured";

pub const CATEGORIES: &[Category] = &[
    Category {
        name: "basic_information",
        description: "General identity of [hotelName]: brand, star rating, number of rooms and floors, year built or renovated, overall property description.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "contacts",
        description: "Contact details for [hotelName]: street address, phone numbers, email addresses, social media handles.",
        capture_guide: Some("Copy phone numbers and email addresses exactly as written; do not reformat them."),
        merge_guide: Some("When two sources disagree on a phone number or address, keep the newer value and drop the old one."),
    },
    Category {
        name: "accessibility",
        description: "Accessibility features of [hotelName]: wheelchair access, accessible rooms and bathrooms, hearing-impaired facilities, service animal policy.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "amenities",
        description: "Property-wide amenities at [hotelName]: pool, spa, sauna, garden, terrace, bars, shops, and similar facilities available to guests.",
        capture_guide: Some("List each amenity by its exact on-site name; keep opening hours when stated."),
        merge_guide: None,
    },
    Category {
        name: "cleanliness_enhancements",
        description: "Enhanced cleaning and hygiene measures at [hotelName]: disinfection protocols, contactless options, certifications.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "food_beverage",
        description: "Restaurants, bars, room service, and breakfast offerings at [hotelName], including cuisine types, hours, and dress codes.",
        capture_guide: Some("Keep restaurant names, cuisine, and serving hours together as stated."),
        merge_guide: None,
    },
    Category {
        name: "guest_rooms",
        description: "Room types and in-room features at [hotelName]: categories, bed configurations, views, sizes, rates when published.",
        capture_guide: Some("Preserve exact room type names and published prices."),
        merge_guide: Some("Prefer newer prices on conflict; never drop a room type that only one source mentions."),
    },
    Category {
        name: "guest_services_front_desk",
        description: "Front desk and guest services at [hotelName]: reception hours, concierge, luggage storage, wake-up calls, currency exchange.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "housekeeping_laundry",
        description: "Housekeeping and laundry services at [hotelName]: cleaning frequency, laundry, dry cleaning, ironing facilities.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "local_area_information",
        description: "Surroundings of [hotelName]: nearby attractions, landmarks, distances, neighborhood description, airports and stations.",
        capture_guide: Some("Keep stated distances and travel times verbatim."),
        merge_guide: None,
    },
    Category {
        name: "meeting_events",
        description: "Meeting and event facilities at [hotelName]: conference rooms, capacities, banquet and wedding services, AV equipment.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "on_property_convenience",
        description: "On-property conveniences at [hotelName]: ATM, gift shop, vending machines, ice machines, convenience store.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "parking_transportation",
        description: "Parking and transportation at [hotelName]: self and valet parking with fees, EV charging, shuttle services, public transit access.",
        capture_guide: Some("Keep parking fees and shuttle schedules exactly as published."),
        merge_guide: Some("On fee conflicts, prefer the newer figure."),
    },
    Category {
        name: "policies",
        description: "Policies of [hotelName]: check-in and check-out times, cancellation terms, pet policy, smoking policy, age requirements, deposits.",
        capture_guide: Some("Quote times, fees, and conditions exactly; do not summarize away limits or exceptions."),
        merge_guide: Some("On conflicting times or fees, prefer the newer statement."),
    },
    Category {
        name: "recreation_fitness",
        description: "Recreation and fitness at [hotelName]: gym, classes, sports facilities, bike rental, kids club, seasonal activities.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "safety_security",
        description: "Safety and security at [hotelName]: 24-hour security, CCTV, in-room safes, smoke detectors, emergency procedures.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "technology_business_services",
        description: "Technology and business services at [hotelName]: Wi-Fi coverage and fees, business center, printing, smart-room features.",
        capture_guide: None,
        merge_guide: None,
    },
    Category {
        name: "faq",
        description: "Frequently asked questions published by [hotelName], with their answers.",
        capture_guide: Some("Copy each question and its answer verbatim; never paraphrase, shorten, or merge Q&A pairs."),
        merge_guide: Some("Keep every distinct question; when the same question appears twice, keep the newer answer."),
    },
    Category {
        name: OTHER,
        description: "Any other factual information about [hotelName] that does not fit the categories above, such as loyalty programs, awards, or sustainability notes.",
        capture_guide: None,
        merge_guide: None,
    },
];

/// Look up a category by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.name == name)
}

/// True iff `name` is a writable market-data column: a category name or the
/// derived `other_structured` column.
#[must_use]
pub fn is_known_column(name: &str) -> bool {
    name == OTHER_STRUCTURED || find(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn schema_is_closed_and_unique() {
        let names: HashSet<_> = CATEGORIES.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), CATEGORIES.len(), "duplicate category name");
        assert_eq!(CATEGORIES.len(), 19);
        assert!(names.contains(OTHER));
        assert!(!names.contains(OTHER_STRUCTURED));
    }

    #[test]
    fn column_names_are_sql_safe_identifiers() {
        for c in CATEGORIES {
            assert!(
                c.name.chars().all(|ch| ch.is_ascii_lowercase() || ch == '_'),
                "category {} is not a plain snake_case identifier",
                c.name
            );
        }
    }

    #[test]
    fn known_column_includes_derived() {
        assert!(is_known_column("guest_rooms"));
        assert!(is_known_column(OTHER_STRUCTURED));
        assert!(!is_known_column("guest_rooms; DROP TABLE hotels"));
    }

    #[test]
    fn other_has_no_field_rules() {
        let other = find(OTHER).expect("other must exist");
        assert!(other.capture_guide.is_none());
        assert!(other.merge_guide.is_none());
    }
}
