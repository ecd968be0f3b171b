//! Chat-completions client and output recovery utilities.

pub mod client;
pub mod json_util;

pub use client::{EXTRACT_MAX_TOKENS, LlmClient, MERGE_MAX_TOKENS, MODEL, REFINE_MAX_TOKENS};
pub use json_util::{JsonRecovery, recover_object, value_to_text};
