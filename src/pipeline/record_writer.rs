//! Market-data record writes.
//!
//! Collects the fields that survived adjudication into one upsert. A hotel
//! with no existing record takes the freshly refined map directly; the
//! catch-all `other` field additionally derives a structured JSON column.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::categories::{OTHER, OTHER_STRUCTURED};
use crate::error::Result;
use crate::llm::{self, LlmClient};
use crate::pipeline::merge::MergeDecision;
use crate::store::MarketStore;

const STRUCTURE_SYSTEM_PROMPT: &str = "You convert free-form hotel notes into a flat \
    JSON object. Keys are snake_case identifiers derived from the text; values are \
    short strings. No nesting, no arrays. Respond with JSON only.";

/// Values the extractor uses for "nothing found"; never written to a fresh
/// record.
fn is_absent(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a")
}

/// Assemble the update set for a hotel.
///
/// With no existing record, every non-absent refined value is written.
/// Otherwise only fields whose adjudication said `is_update` are written.
#[must_use]
pub fn build_update_set(
    has_existing_record: bool,
    refined: &BTreeMap<String, String>,
    decisions: &BTreeMap<String, MergeDecision>,
) -> BTreeMap<String, String> {
    if !has_existing_record {
        return refined
            .iter()
            .filter(|(_, value)| !is_absent(value))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
    }
    decisions
        .iter()
        .filter(|(_, decision)| decision.is_update)
        .map(|(field, decision)| (field.clone(), decision.merged_text.clone()))
        .collect()
}

/// Convert the free-form `other` text into a flat snake_case JSON object,
/// serialized. Falls back to `{}` when the model output cannot be parsed.
pub async fn structure_other(llm: &LlmClient, other_text: &str) -> String {
    let prompt = format!(
        "Convert the following hotel notes into a flat JSON object with snake_case \
         keys:\n\n{other_text}"
    );
    let response = match llm
        .complete(STRUCTURE_SYSTEM_PROMPT, &prompt, llm::MERGE_MAX_TOKENS)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "other-structuring call failed, storing empty object");
            return "{}".to_string();
        }
    };

    match llm::recover_object(&response).into_object() {
        Some(object) => {
            serde_json::to_string(&serde_json::Value::Object(object))
                .unwrap_or_else(|_| "{}".to_string())
        }
        None => "{}".to_string(),
    }
}

/// Write the adjudicated fields for one hotel. Returns the number of
/// columns written (0 for a no-op).
pub async fn write_record(
    market: &MarketStore,
    llm: &LlmClient,
    hotel_id: &str,
    mut update: BTreeMap<String, String>,
) -> Result<usize> {
    if update.is_empty() {
        info!(hotel_id, "no fields survived adjudication, skipping record write");
        return Ok(0);
    }

    // The structured companion column tracks `other` updates exactly.
    if let Some(other_text) = update.get(OTHER).cloned() {
        let structured = structure_other(llm, &other_text).await;
        update.insert(OTHER_STRUCTURED.to_string(), structured);
    }

    let written = update.len();
    market.upsert(hotel_id, &update).await?;
    info!(hotel_id, fields = written, "market-data record updated");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refined_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fresh_record_takes_non_absent_refined_values() {
        let refined = refined_map(&[
            ("guest_rooms", "Ocean-view rooms from $199."),
            ("amenities", ""),
            ("policies", "N/A"),
            ("faq", "n/a"),
        ]);
        let update = build_update_set(false, &refined, &BTreeMap::new());
        assert_eq!(update.len(), 1);
        assert_eq!(update["guest_rooms"], "Ocean-view rooms from $199.");
    }

    #[test]
    fn existing_record_takes_only_adjudicated_updates() {
        let refined = refined_map(&[("guest_rooms", "new"), ("amenities", "same")]);
        let mut decisions = BTreeMap::new();
        decisions.insert(
            "guest_rooms".to_string(),
            MergeDecision {
                is_update: true,
                merged_text: "Ocean-view rooms from $229.".to_string(),
            },
        );
        decisions.insert(
            "amenities".to_string(),
            MergeDecision {
                is_update: false,
                merged_text: "Pool.".to_string(),
            },
        );
        let update = build_update_set(true, &refined, &decisions);
        assert_eq!(update.len(), 1);
        assert_eq!(update["guest_rooms"], "Ocean-view rooms from $229.");
    }

    #[test]
    fn empty_decisions_produce_an_empty_update_set() {
        let refined = refined_map(&[("guest_rooms", "text")]);
        let update = build_update_set(true, &refined, &BTreeMap::new());
        assert!(update.is_empty());
    }

    #[tokio::test]
    async fn structure_other_parses_flat_object() {
        let mut server = mockito::Server::new_async().await;
        let content = r#"{"loyalty": "Marriott Bonvoy", "parking_valet": "$35"}"#;
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        });
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let llm = LlmClient::new(&server.url(), "key", std::time::Duration::from_secs(5), 0)
            .expect("client builds");
        let structured =
            structure_other(&llm, "Loyalty: Marriott Bonvoy; Parking valet: $35").await;
        let parsed: serde_json::Value = serde_json::from_str(&structured).expect("valid json");
        assert_eq!(parsed["loyalty"], "Marriott Bonvoy");
        assert_eq!(parsed["parking_valet"], "$35");
    }

    #[tokio::test]
    async fn structure_other_falls_back_to_empty_object() {
        let llm = LlmClient::new(
            "http://127.0.0.1:1",
            "key",
            std::time::Duration::from_millis(100),
            0,
        )
        .expect("client builds");
        assert_eq!(structure_other(&llm, "anything").await, "{}");
    }
}
