//! Log-backed notifier.
//!
//! Real delivery (mail, push) lives outside this workspace; this
//! implementation records each event as a structured tracing event so the
//! seam is exercised end to end.

use nestmate_core::error::NestmateResult;
use nestmate_core::notify::{MatchEvent, Notifier};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    async fn notify(&self, event: MatchEvent) -> NestmateResult<()> {
        info!(?event, "match event");
        Ok(())
    }
}
