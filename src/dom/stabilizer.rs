//! Convergence wait for dynamically-rendered pages.
//!
//! Hotel sites inflate hero sections, carousels, and booking widgets well
//! after `networkidle`; a fixed sleep is wasteful on static pages and too
//! short on heavy ones. Instead the page is polled for a DOM signature and
//! considered stable once the signature has not changed for a quiet window.
//! Hitting the overall timeout is success, not failure: the snapshot is
//! taken with whatever the page settled into.

use std::time::{Duration, Instant};

use chromiumoxide::Page;
use tracing::{debug, trace};

use super::js_scripts::SIGNATURE_SCRIPT;

/// Stabilization tuning for one page.
#[derive(Debug, Clone, Copy)]
pub struct StabilizeParams {
    /// Signature must be unchanged for this long.
    pub quiet_ms: u64,
    /// Hard budget; elapsing it ends the wait silently.
    pub timeout_ms: u64,
    /// Minimum spacing between signature recomputations.
    pub min_signature_interval_ms: u64,
}

impl StabilizeParams {
    /// Depth-tuned parameters: the entry page gets a longer budget because
    /// it carries the heaviest widgets.
    #[must_use]
    pub fn for_depth(depth: u32) -> Self {
        if depth == 0 {
            Self {
                quiet_ms: 6000,
                timeout_ms: 12_000,
                min_signature_interval_ms: 400,
            }
        } else {
            Self {
                quiet_ms: 4000,
                timeout_ms: 8000,
                min_signature_interval_ms: 400,
            }
        }
    }
}

/// Block until the DOM signature has been unchanged for `quiet_ms`, or
/// `timeout_ms` has elapsed. Signature evaluation errors count as
/// "unchanged"; the wait never fails.
pub async fn wait_for_quiescence(page: &Page, params: StabilizeParams) {
    let started = Instant::now();
    let timeout = Duration::from_millis(params.timeout_ms);
    let quiet = Duration::from_millis(params.quiet_ms);
    let interval = Duration::from_millis(params.min_signature_interval_ms.max(1));

    // Signature state is local to this wait; each page starts fresh.
    let mut last_signature: Option<String> = None;
    let mut quiet_since = Instant::now();

    loop {
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            debug!(elapsed_ms = elapsed.as_millis() as u64, "stabilizer timeout, proceeding");
            return;
        }

        tokio::time::sleep(interval.min(timeout - elapsed)).await;

        let signature = match page.evaluate(SIGNATURE_SCRIPT).await {
            Ok(result) => result.into_value::<String>().ok(),
            Err(e) => {
                trace!(error = %e, "signature evaluation failed, keeping last");
                None
            }
        };

        match signature {
            Some(sig) if last_signature.as_deref() != Some(sig.as_str()) => {
                trace!(signature = %sig, "dom signature changed");
                last_signature = Some(sig);
                quiet_since = Instant::now();
            }
            // Unchanged (or unreadable): the quiet window keeps accruing.
            _ => {
                if quiet_since.elapsed() >= quiet {
                    debug!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "dom quiescent"
                    );
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_zero_gets_the_long_budget() {
        let p = StabilizeParams::for_depth(0);
        assert_eq!((p.quiet_ms, p.timeout_ms), (6000, 12_000));
    }

    #[test]
    fn deeper_pages_get_the_short_budget() {
        for depth in [1, 2, 7] {
            let p = StabilizeParams::for_depth(depth);
            assert_eq!((p.quiet_ms, p.timeout_ms), (4000, 8000));
            assert_eq!(p.min_signature_interval_ms, 400);
        }
    }
}
