use chrono::NaiveDate;
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::model::TimeSlot;

/// A collaborator that can answer "is this date+time still free?". The
/// production implementation asks the backend; tests script answers.
pub trait AvailabilityCheck {
    fn is_free(
        &self,
        date: NaiveDate,
        time: &str,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;
}

/// Annotate generated slots with real availability. One check per slot,
/// all issued together and awaited as a unit; completion order does not
/// matter and the output keeps the input order.
///
/// Fail-open: a failed check leaves its slot available and only logs. A
/// hidden slot loses a booking, a stale one is caught at booking time.
pub async fn annotate<C: AvailabilityCheck>(
    mut slots: Vec<TimeSlot>,
    date: NaiveDate,
    checker: &C,
) -> Vec<TimeSlot> {
    let checks = slots.iter().map(|slot| checker.is_free(date, &slot.time));
    let results = join_all(checks).await;

    let mut failed = 0_usize;
    for (slot, result) in slots.iter_mut().zip(results) {
        match result {
            Ok(free) => slot.available = free,
            Err(err) => {
                failed += 1;
                warn!(time = %slot.time, error = %err, "availability check failed; keeping slot open");
                slot.available = true;
            }
        }
    }

    debug!(
        total = slots.len(),
        failed,
        open = slots.iter().filter(|s| s.available).count(),
        "annotated slots"
    );
    slots
}
