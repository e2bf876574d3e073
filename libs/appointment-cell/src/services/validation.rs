// Pure slot rules: batch shape, per-slot times, overlaps and query ranges.
// Nothing here touches storage; callers pass the `now` they read once.

use chrono::{DateTime, Duration, Utc};

use crate::error::SlotValidationError;
use crate::models::{Slot, SlotCandidate};

/// Half-open interval intersection. `[a, b)` and `[b, c)` do not overlap.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

pub fn validate_times(
    index: usize,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), SlotValidationError> {
    if start_time <= now {
        return Err(SlotValidationError::StartNotInFuture { index });
    }
    if end_time <= start_time {
        return Err(SlotValidationError::EndNotAfterStart { index });
    }
    Ok(())
}

/// Checks a creation batch on its own: size, then every slot in submission
/// order, then overlaps between candidates.
pub fn validate_batch(
    candidates: &[SlotCandidate],
    now: DateTime<Utc>,
    max_slots: usize,
) -> Result<(), SlotValidationError> {
    if candidates.is_empty() {
        return Err(SlotValidationError::EmptyBatch);
    }
    if candidates.len() > max_slots {
        return Err(SlotValidationError::BatchTooLarge {
            max: max_slots,
            actual: candidates.len(),
        });
    }

    for (index, candidate) in candidates.iter().enumerate() {
        validate_times(index, candidate.start_time, candidate.end_time, now)?;
    }

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by_key(|&i| (candidates[i].start_time, candidates[i].end_time));

    for pair in order.windows(2) {
        let (prev, next) = (&candidates[pair[0]], &candidates[pair[1]]);
        if next.start_time < prev.end_time {
            let (first, second) = if pair[0] < pair[1] {
                (pair[0], pair[1])
            } else {
                (pair[1], pair[0])
            };
            return Err(SlotValidationError::OverlapsWithinBatch { first, second });
        }
    }

    Ok(())
}

/// Earliest start and latest end of the batch.
pub fn envelope(candidates: &[SlotCandidate]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = candidates.iter().map(|c| c.start_time).min()?;
    let end = candidates.iter().map(|c| c.end_time).max()?;
    Some((start, end))
}

/// First persisted slot intersecting any candidate.
pub fn find_persisted_overlap<'a>(
    candidates: &[SlotCandidate],
    existing: &'a [Slot],
) -> Option<&'a Slot> {
    existing.iter().find(|slot| {
        candidates
            .iter()
            .any(|c| intervals_overlap(slot.start_time, slot.end_time, c.start_time, c.end_time))
    })
}

/// Validates an availability query and returns the effective lower bound,
/// which never lies in the past.
pub fn validate_available_range(
    after: DateTime<Utc>,
    before: DateTime<Utc>,
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Result<DateTime<Utc>, SlotValidationError> {
    if after >= before {
        return Err(SlotValidationError::InvalidRange);
    }
    // A horizon too large to represent places no bound on the query.
    let horizon_end = Duration::try_days(horizon_days).and_then(|horizon| now.checked_add_signed(horizon));
    if horizon_end.is_some_and(|end| before > end) {
        return Err(SlotValidationError::RangeExceedsHorizon { max_days: horizon_days });
    }
    Ok(after.max(now))
}

/// Validates a listing window for the doctor and patient views.
pub fn validate_window(
    after: DateTime<Utc>,
    before: DateTime<Utc>,
    max_days: i64,
) -> Result<(), SlotValidationError> {
    if after >= before {
        return Err(SlotValidationError::InvalidRange);
    }
    if Duration::try_days(max_days).is_some_and(|max| before - after > max) {
        return Err(SlotValidationError::WindowTooWide { max_days });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 27, 12, 0, 0).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 28, hour, minute, 0).unwrap()
    }

    fn candidate(start: DateTime<Utc>, end: DateTime<Utc>) -> SlotCandidate {
        SlotCandidate { start_time: start, end_time: end }
    }

    #[test]
    fn back_to_back_slots_are_accepted() {
        let batch = [candidate(at(10, 30), at(11, 0)), candidate(at(10, 0), at(10, 30))];
        assert_eq!(validate_batch(&batch, now(), 100), Ok(()));
    }

    #[test]
    fn one_nanosecond_overlap_is_rejected() {
        let first_end = at(10, 30) + Duration::nanoseconds(1);
        let batch = [candidate(at(10, 0), first_end), candidate(at(10, 30), at(11, 0))];
        assert_eq!(
            validate_batch(&batch, now(), 100),
            Err(SlotValidationError::OverlapsWithinBatch { first: 0, second: 1 })
        );
    }

    #[test]
    fn overlap_reports_submission_indices() {
        let batch = [
            candidate(at(14, 0), at(14, 30)),
            candidate(at(9, 0), at(9, 30)),
            candidate(at(9, 15), at(9, 45)),
        ];
        assert_eq!(
            validate_batch(&batch, now(), 100),
            Err(SlotValidationError::OverlapsWithinBatch { first: 1, second: 2 })
        );
    }

    #[test]
    fn per_slot_rules_fail_fast_in_order() {
        let batch = [
            candidate(at(10, 0), at(10, 30)),
            candidate(at(11, 0), at(11, 0)),
            candidate(now() - Duration::hours(1), now()),
        ];
        assert_eq!(
            validate_batch(&batch, now(), 100),
            Err(SlotValidationError::EndNotAfterStart { index: 1 })
        );

        let past = [candidate(now(), now() + Duration::minutes(30))];
        assert_eq!(
            validate_batch(&past, now(), 100),
            Err(SlotValidationError::StartNotInFuture { index: 0 })
        );
    }

    #[test]
    fn batch_size_limits() {
        assert_eq!(validate_batch(&[], now(), 100), Err(SlotValidationError::EmptyBatch));

        let batch: Vec<_> = (0..3)
            .map(|i| candidate(at(9 + i, 0), at(9 + i, 30)))
            .collect();
        assert_eq!(
            validate_batch(&batch, now(), 2),
            Err(SlotValidationError::BatchTooLarge { max: 2, actual: 3 })
        );
    }

    #[test]
    fn persisted_overlap_uses_strict_intersection() {
        let doctor = Uuid::new_v4();
        let existing = vec![Slot::new(doctor, at(10, 0), at(10, 30), now())];

        let touching = [candidate(at(10, 30), at(11, 0)), candidate(at(9, 30), at(10, 0))];
        assert!(find_persisted_overlap(&touching, &existing).is_none());

        let crossing = [candidate(at(10, 15), at(10, 45))];
        assert_eq!(find_persisted_overlap(&crossing, &existing).map(|s| s.id), Some(existing[0].id));

        let enclosing = [candidate(at(9, 0), at(12, 0))];
        assert!(find_persisted_overlap(&enclosing, &existing).is_some());
    }

    #[test]
    fn envelope_spans_batch() {
        let batch = [candidate(at(13, 0), at(13, 30)), candidate(at(9, 0), at(9, 30))];
        assert_eq!(envelope(&batch), Some((at(9, 0), at(13, 30))));
        assert_eq!(envelope(&[]), None);
    }

    #[test]
    fn available_range_is_clamped_and_capped() {
        let n = now();
        assert_eq!(
            validate_available_range(n - Duration::days(3), n + Duration::days(1), n, 365),
            Ok(n)
        );
        assert_eq!(
            validate_available_range(n + Duration::days(1), n + Duration::days(2), n, 365),
            Ok(n + Duration::days(1))
        );
        assert_eq!(
            validate_available_range(n, n + Duration::days(730), n, 365),
            Err(SlotValidationError::RangeExceedsHorizon { max_days: 365 })
        );
        assert_eq!(
            validate_available_range(n + Duration::days(2), n + Duration::days(1), n, 365),
            Err(SlotValidationError::InvalidRange)
        );
    }

    #[test]
    fn listing_window_limits() {
        let n = now();
        assert!(validate_window(n, n + Duration::days(30), 366).is_ok());
        assert_eq!(validate_window(n, n, 366), Err(SlotValidationError::InvalidRange));
        assert_eq!(
            validate_window(n, n + Duration::days(400), 366),
            Err(SlotValidationError::WindowTooWide { max_days: 366 })
        );
    }

    #[test]
    fn unrepresentable_limits_do_not_panic() {
        let n = now();
        assert_eq!(
            validate_available_range(n, n + Duration::days(730), n, 1_000_000_000_000),
            Ok(n)
        );
        assert!(validate_window(n, n + Duration::days(400), i64::MAX).is_ok());
    }
}
