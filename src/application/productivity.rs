use crate::domain::models::{CompletedInterval, DailyTotal, StoredInterval};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::productivity_repository::ProductivityRepository;
use log::{debug, info};
use std::sync::Arc;

/// Server side of interval recording: validation, duplicate rejection, day bucketing.
pub struct ProductivityService<R>
where
    R: ProductivityRepository + ?Sized,
{
    repository: Arc<R>,
}

const NOT_FINITE_MESSAGE: &str = "Start and end must be finite!";
const NOT_FORWARD_MESSAGE: &str = "End must be after start!";

fn whole_millis(value: f64) -> Option<i64> {
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

/// Orders the raw bounds first, then widens fractional bounds outward to whole
/// milliseconds so a forward range stays forward.
fn parse_bounds(start_ms: Option<f64>, end_ms: Option<f64>) -> Result<CompletedInterval, InfraError> {
    let not_finite = || InfraError::InvalidInterval(NOT_FINITE_MESSAGE.to_string());
    let (Some(start_ms), Some(end_ms)) = (
        start_ms.filter(|value| value.is_finite()),
        end_ms.filter(|value| value.is_finite()),
    ) else {
        return Err(not_finite());
    };
    if end_ms <= start_ms {
        return Err(InfraError::InvalidInterval(NOT_FORWARD_MESSAGE.to_string()));
    }
    match (whole_millis(start_ms.floor()), whole_millis(end_ms.ceil())) {
        (Some(start), Some(end)) => CompletedInterval::from_millis(start, end).ok_or_else(not_finite),
        _ => Err(not_finite()),
    }
}

impl<R> ProductivityService<R>
where
    R: ProductivityRepository + ?Sized,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn record_interval(
        &self,
        user_id: &str,
        start_ms: Option<f64>,
        end_ms: Option<f64>,
    ) -> Result<StoredInterval, InfraError> {
        if user_id.trim().is_empty() {
            return Err(InfraError::Unauthenticated);
        }
        let interval = parse_bounds(start_ms, end_ms)?;
        let record = StoredInterval::for_user(user_id, interval);
        if !self.repository.insert_interval(&record)? {
            debug!(
                "duplicate interval {}..{} for {user_id}",
                interval.start_ms(),
                interval.end_ms()
            );
            return Err(InfraError::DuplicateInterval);
        }
        info!(
            "stored {}s interval on {} for {user_id}",
            record.duration_seconds, record.date
        );
        Ok(record)
    }

    pub fn daily_totals(&self, user_id: &str) -> Result<Vec<DailyTotal>, InfraError> {
        self.repository.daily_totals(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::productivity_repository::InMemoryProductivityRepository;

    const START_MS: f64 = 1_771_232_400_000.0;

    fn service() -> ProductivityService<InMemoryProductivityRepository> {
        ProductivityService::new(Arc::new(InMemoryProductivityRepository::default()))
    }

    #[test]
    fn records_floor_duration_and_utc_day() {
        let service = service();
        let stored = service
            .record_interval("user_1", Some(START_MS), Some(START_MS + 90_999.0))
            .expect("record");
        assert_eq!(stored.duration_seconds, 90);
        assert_eq!(stored.date, "2026-02-16");
        assert_eq!(
            service.daily_totals("user_1").expect("totals"),
            vec![DailyTotal {
                date: "2026-02-16".to_string(),
                total_duration: 90,
            }]
        );
    }

    #[test]
    fn rejects_missing_non_finite_and_reversed_bounds() {
        let service = service();
        for (start, end) in [
            (None, Some(START_MS)),
            (Some(f64::NAN), Some(START_MS)),
            (Some(START_MS), Some(f64::INFINITY)),
            (Some(START_MS), Some(START_MS)),
            (Some(START_MS), Some(START_MS - 1_000.0)),
        ] {
            assert!(matches!(
                service.record_interval("user_1", start, end),
                Err(InfraError::InvalidInterval(_))
            ));
        }
        assert!(service.daily_totals("user_1").expect("totals").is_empty());
    }

    #[test]
    fn sub_second_bounds_are_ordered_before_rounding() {
        let service = service();
        let stored = service
            .record_interval("user_1", Some(START_MS + 0.2), Some(START_MS + 0.8))
            .expect("forward range inside one millisecond");
        assert_eq!(stored.interval.start_ms(), START_MS as i64);
        assert_eq!(stored.interval.end_ms(), START_MS as i64 + 1);
        assert_eq!(stored.duration_seconds, 0);

        match service.record_interval("user_1", Some(START_MS + 0.8), Some(START_MS + 0.2)) {
            Err(InfraError::InvalidInterval(message)) => assert_eq!(message, NOT_FORWARD_MESSAGE),
            other => panic!("expected ordering error, got {other:?}"),
        }
    }

    #[test]
    fn unrepresentable_bounds_report_finite_message() {
        match service().record_interval("user_1", Some(1e300), Some(2e300)) {
            Err(InfraError::InvalidInterval(message)) => assert_eq!(message, NOT_FINITE_MESSAGE),
            other => panic!("expected range error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_interval_is_rejected_without_new_row() {
        let service = service();
        service
            .record_interval("user_1", Some(START_MS), Some(START_MS + 60_000.0))
            .expect("first");
        assert!(matches!(
            service.record_interval("user_1", Some(START_MS), Some(START_MS + 60_000.0)),
            Err(InfraError::DuplicateInterval)
        ));
        service
            .record_interval("user_2", Some(START_MS), Some(START_MS + 60_000.0))
            .expect("other user may store the same range");

        assert_eq!(
            service.daily_totals("user_1").expect("totals"),
            vec![DailyTotal {
                date: "2026-02-16".to_string(),
                total_duration: 60,
            }]
        );
    }

    #[test]
    fn blank_user_is_unauthenticated() {
        assert!(matches!(
            service().record_interval(" ", Some(START_MS), Some(START_MS + 1_000.0)),
            Err(InfraError::Unauthenticated)
        ));
    }
}
