use chrono::{Months, NaiveDate};
use tracing::trace;

use crate::error::ScheduleError;

/// Booster due date for a dose given on `administered_on`.
///
/// A zero interval means the vaccine needs no booster and yields `None`.
/// Month arithmetic keeps the day of month and clamps to the last day of
/// shorter months, so Jan 31 + 1 month lands on Feb 28 or 29.
pub fn compute_next_due(
    administered_on: NaiveDate,
    interval_months: i64,
) -> Result<Option<NaiveDate>, ScheduleError> {
    if interval_months < 0 {
        return Err(ScheduleError::InvalidInterval {
            months: interval_months,
        });
    }
    if interval_months == 0 {
        return Ok(None);
    }

    let months = u32::try_from(interval_months).map_err(|_| ScheduleError::InvalidInterval {
        months: interval_months,
    })?;
    let next = administered_on
        .checked_add_months(Months::new(months))
        .ok_or_else(|| {
            ScheduleError::invalid_date(format!("{administered_on} + {interval_months} months"))
        })?;

    trace!(%administered_on, interval_months, %next, "computed next due date");
    Ok(Some(next))
}

/// Checks that a dose date is not in the future relative to `today`.
pub fn validate_administered_on(
    administered_on: NaiveDate,
    today: NaiveDate,
) -> Result<NaiveDate, ScheduleError> {
    if administered_on > today {
        return Err(ScheduleError::FutureAdministration {
            date: administered_on,
            today,
        });
    }
    Ok(administered_on)
}

pub fn validate_dose_order(value: i64) -> Result<u32, ScheduleError> {
    if value < 1 {
        return Err(ScheduleError::InvalidDoseOrder { value });
    }
    u32::try_from(value).map_err(|_| ScheduleError::InvalidDoseOrder { value })
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate};

    use super::{compute_next_due, validate_administered_on, validate_dose_order};
    use crate::error::ScheduleError;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn zero_interval_has_no_due_date() {
        for date in [ymd(2020, 1, 1), ymd(2024, 2, 29), ymd(1999, 12, 31)] {
            assert_eq!(compute_next_due(date, 0).expect("zero interval"), None);
        }
    }

    #[test]
    fn negative_interval_is_rejected() {
        assert_eq!(
            compute_next_due(ymd(2024, 1, 1), -3),
            Err(ScheduleError::InvalidInterval { months: -3 })
        );
    }

    #[test]
    fn clamps_to_end_of_shorter_month() {
        assert_eq!(
            compute_next_due(ymd(2024, 1, 31), 1).expect("leap year"),
            Some(ymd(2024, 2, 29))
        );
        assert_eq!(
            compute_next_due(ymd(2023, 1, 31), 1).expect("common year"),
            Some(ymd(2023, 2, 28))
        );
        assert_eq!(
            compute_next_due(ymd(2024, 8, 31), 1).expect("30-day month"),
            Some(ymd(2024, 9, 30))
        );
    }

    #[test]
    fn month_and_year_carry_forward() {
        let administered = ymd(2023, 11, 15);
        for interval in [1_i64, 2, 12, 13, 60, 120] {
            let next = compute_next_due(administered, interval)
                .expect("valid interval")
                .expect("due date");
            let months_from_zero = i64::from(administered.month0()) + interval;
            assert_eq!(i64::from(next.month0()), months_from_zero % 12);
            assert_eq!(
                i64::from(next.year()),
                i64::from(administered.year()) + months_from_zero / 12
            );
            assert_eq!(next.day(), 15);
        }
    }

    #[test]
    fn due_date_past_calendar_range_is_invalid_date() {
        assert!(matches!(
            compute_next_due(NaiveDate::MAX, 1),
            Err(ScheduleError::InvalidDate { .. })
        ));
        assert!(matches!(
            compute_next_due(ymd(2024, 1, 1), i64::from(u32::MAX)),
            Err(ScheduleError::InvalidDate { .. })
        ));
    }

    #[test]
    fn interval_beyond_month_range_is_invalid_interval() {
        assert_eq!(
            compute_next_due(ymd(2024, 1, 1), i64::MAX),
            Err(ScheduleError::InvalidInterval { months: i64::MAX })
        );
        let just_over = i64::from(u32::MAX) + 1;
        assert_eq!(
            compute_next_due(ymd(2024, 1, 1), just_over),
            Err(ScheduleError::InvalidInterval { months: just_over })
        );
    }

    #[test]
    fn rejects_future_administration() {
        let today = ymd(2024, 5, 10);
        assert!(validate_administered_on(today, today).is_ok());
        assert!(matches!(
            validate_administered_on(ymd(2024, 5, 11), today),
            Err(ScheduleError::FutureAdministration { .. })
        ));
    }

    #[test]
    fn dose_order_starts_at_one() {
        assert_eq!(validate_dose_order(1).expect("first dose"), 1);
        assert_eq!(
            validate_dose_order(0),
            Err(ScheduleError::InvalidDoseOrder { value: 0 })
        );
    }
}
