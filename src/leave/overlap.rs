use super::days::DateRange;
use super::error::LeaveError;
use crate::store::{LeaveStore, LeaveTx, OverlapQuery};

pub const DEFAULT_OVERLAP_THRESHOLD: u32 = 2;

/// Department overlap policy: a request may be approved while fewer than
/// `threshold` other approved requests in the same department meet its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapPolicy {
    pub threshold: u32,
}

impl Default for OverlapPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_OVERLAP_THRESHOLD,
        }
    }
}

impl OverlapPolicy {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn allow(&self, overlaps: u64) -> bool {
        overlaps < u64::from(self.threshold)
    }

    /// `Conflict` when the count reaches the threshold.
    pub fn check(&self, overlaps: u64) -> Result<(), LeaveError> {
        if self.allow(overlaps) {
            Ok(())
        } else {
            Err(LeaveError::Conflict {
                overlaps,
                threshold: self.threshold,
            })
        }
    }
}

pub fn overlap_query(department_id: u64, range: DateRange, exclude: Option<u64>) -> OverlapQuery {
    OverlapQuery {
        department_id,
        window: range.window(),
        exclude_request_id: exclude,
    }
}

pub async fn count_approved_overlaps(
    store: &dyn LeaveStore,
    department_id: u64,
    range: DateRange,
    exclude: Option<u64>,
) -> Result<u64, LeaveError> {
    Ok(store
        .count_approved_overlaps(&overlap_query(department_id, range, exclude))
        .await?)
}

pub async fn count_approved_overlaps_in(
    tx: &mut dyn LeaveTx,
    department_id: u64,
    range: DateRange,
    exclude: Option<u64>,
) -> Result<u64, LeaveError> {
    Ok(tx
        .count_approved_overlaps(&overlap_query(department_id, range, exclude))
        .await?)
}
