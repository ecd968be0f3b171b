//! In-browser DOM handling: stabilization, canonicalization, and the
//! JavaScript these are built from.

pub mod cleaner;
pub mod js_scripts;
pub mod stabilizer;

pub use cleaner::canonical_html;
pub use stabilizer::{StabilizeParams, wait_for_quiescence};
