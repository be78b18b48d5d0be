use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::services::attempt_lifecycle::SweepReport;

/// One pass of the expiry sweep: finalizes a batch of attempts whose window has closed
/// but that nobody submitted or reopened.
pub(crate) async fn sweep_expired_attempts(state: &AppState) -> Result<SweepReport> {
    let batch = state.settings().attempts().sweep_batch_size;
    let report = state
        .lifecycle()
        .sweep_expired(primitive_now_utc(), batch)
        .await
        .context("Failed to sweep expired attempts")?;

    if report.finalized == 0 && report.already_submitted == 0 {
        return Ok(report);
    }

    tracing::info!(
        finalized = report.finalized,
        already_submitted = report.already_submitted,
        "Swept expired attempts"
    );
    metrics::counter!("expired_attempts_swept_total").increment(report.finalized as u64);

    Ok(report)
}
