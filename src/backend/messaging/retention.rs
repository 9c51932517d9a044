//! Message retention
//!
//! Trims every space's history down to its newest messages. Run on a
//! schedule by the `clawswarm-cleanup` binary.

use crate::backend::store::{MessageStore, StoreError};

/// Outcome of one retention pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Spaces found over the cap
    pub spaces: usize,
    /// Messages deleted across all spaces
    pub deleted: u64,
    /// Spaces whose delete failed and were skipped
    pub failed: usize,
}

/// Keep at most `cap` messages in every space
///
/// A failure listing the spaces aborts the pass. A failure trimming one
/// space is logged and the sweep moves on to the next.
pub async fn sweep_messages(messages: &dyn MessageStore, cap: usize) -> Result<SweepReport, StoreError> {
    let spaces = messages.spaces_exceeding(cap).await?;
    let mut report = SweepReport {
        spaces: spaces.len(),
        ..SweepReport::default()
    };

    if spaces.is_empty() {
        tracing::info!("[Retention] No spaces exceed {} messages", cap);
        return Ok(report);
    }
    tracing::info!("[Retention] {} spaces exceed {} messages", spaces.len(), cap);

    for space in spaces {
        match messages.delete_beyond(space, cap).await {
            Ok(deleted) => {
                report.deleted += deleted;
                tracing::info!("[Retention] Deleted {} messages from space {}", deleted, space);
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!("[Retention] Failed to trim space {}: {}", space, e);
            }
        }
    }

    tracing::info!(
        "[Retention] Sweep complete: {} deleted across {} spaces ({} failed)",
        report.deleted,
        report.spaces,
        report.failed
    );
    Ok(report)
}
