//! Per-page category extraction.
//!
//! One completion per changed page: the model reads the page markdown and
//! returns a JSON object keyed by the closed category list. Values it
//! cannot find come back as empty strings; output it malforms degrades to
//! an empty map rather than failing the page.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::{debug, warn};

use crate::categories::{self, CATEGORIES};
use crate::error::Result;
use crate::llm::{self, LlmClient};
use crate::store::DirtyPage;

const SYSTEM_PROMPT: &str = "You extract structured hotel information from a single \
    web page. Use only the supplied page content; never invent or infer facts that \
    are not stated on the page. Respond with JSON only.";

/// Build the user prompt for one page.
#[must_use]
pub fn build_prompt(hotel_name: &str, page_url: &str, page_markdown: &str) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Extract information about the hotel \"{hotel_name}\" from the page below."
    );
    let _ = writeln!(prompt, "Page URL: {page_url}");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Categories:");
    for category in CATEGORIES {
        let description = category.description.replace("[hotelName]", hotel_name);
        let _ = write!(prompt, "- {}: {description}", category.name);
        if let Some(guide) = category.capture_guide {
            let _ = write!(prompt, " ({guide})");
        }
        let _ = writeln!(prompt);
    }
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Return a JSON object whose keys are exactly the category names above. \
         Each value is the text found on this page for that category, or an empty \
         string when the page says nothing about it. Keep list-shaped content as \
         comma- or semicolon-separated text. Content must originate solely from \
         the page below."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Page content:\n{page_markdown}");
    prompt
}

/// Run the extractor for one dirty page. The returned map has one entry
/// per category; empty string means "not present on this page".
pub async fn extract_page(
    llm: &LlmClient,
    hotel_name: &str,
    page: &DirtyPage,
) -> Result<BTreeMap<String, String>> {
    let prompt = build_prompt(hotel_name, &page.page_url, &page.markdown);
    let response = llm
        .complete(SYSTEM_PROMPT, &prompt, llm::EXTRACT_MAX_TOKENS)
        .await?;
    Ok(parse_response(&response, &page.page_url))
}

/// Coerce a model response into the category map. Unknown keys are
/// dropped, missing keys become empty strings, and unparseable responses
/// yield an all-empty map.
#[must_use]
pub fn parse_response(response: &str, page_url: &str) -> BTreeMap<String, String> {
    let recovered = llm::recover_object(response).into_object();
    if recovered.is_none() {
        warn!(url = %page_url, "extractor response was not JSON, treating page as empty");
    }
    let object = recovered.unwrap_or_default();

    let mut map = BTreeMap::new();
    for category in CATEGORIES {
        let value = object
            .get(category.name)
            .map(llm::value_to_text)
            .unwrap_or_default();
        map.insert(category.name.to_string(), value);
    }

    for key in object.keys() {
        if categories::find(key).is_none() {
            debug!(url = %page_url, key, "dropping unknown extractor key");
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_substitutes_hotel_name_and_lists_every_category() {
        let prompt = build_prompt("Grand Palace", "https://gp.example/", "# Welcome");
        assert!(prompt.contains("Grand Palace"));
        assert!(!prompt.contains("[hotelName]"));
        for category in CATEGORIES {
            assert!(prompt.contains(category.name), "missing {}", category.name);
        }
    }

    #[test]
    fn prompt_includes_capture_guides() {
        let prompt = build_prompt("Grand Palace", "https://gp.example/faq", "Q: A:");
        assert!(prompt.contains("never paraphrase"));
    }

    #[test]
    fn parse_keeps_known_keys_and_fills_missing_ones() {
        let map = parse_response(
            r#"{"guest_rooms": "Ocean-view rooms from $199.", "made_up": "x"}"#,
            "https://gp.example/rooms",
        );
        assert_eq!(map["guest_rooms"], "Ocean-view rooms from $199.");
        assert_eq!(map["amenities"], "");
        assert!(!map.contains_key("made_up"));
        assert_eq!(map.len(), CATEGORIES.len());
    }

    #[test]
    fn parse_joins_list_values() {
        let map = parse_response(
            r#"{"amenities": ["pool", "spa", "gym"]}"#,
            "https://gp.example/amenities",
        );
        assert_eq!(map["amenities"], "pool, spa, gym");
    }

    #[test]
    fn garbage_response_yields_all_empty_map() {
        let map = parse_response("I could not find any JSON here", "https://gp.example/");
        assert_eq!(map.len(), CATEGORIES.len());
        assert!(map.values().all(String::is_empty));
    }

    #[test]
    fn fenced_response_is_recovered() {
        let map = parse_response(
            "```json\n{\"faq\": \"Q: Pets allowed? A: Yes, under 25 lbs.\"}\n```",
            "https://gp.example/faq",
        );
        assert_eq!(map["faq"], "Q: Pets allowed? A: Yes, under 25 lbs.");
    }
}
