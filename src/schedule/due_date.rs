use chrono::{Days, NaiveDate};

use crate::errors::{Result, ScheduleError};
use crate::rules::DueSpec;
use crate::types::DueTiming;

/// derive a calendar due date from a timing strategy
///
/// pure: no clock, no timezone, the caller's calendar is authoritative
pub fn compute_due_date(
    strategy: DueTiming,
    days: Option<u32>,
    checkin_date: NaiveDate,
    booking_date: NaiveDate,
    specific_date: Option<NaiveDate>,
) -> Result<NaiveDate> {
    match strategy {
        DueTiming::AtBooking => Ok(booking_date),
        DueTiming::OnCheckin => Ok(checkin_date),
        DueTiming::DaysBeforeCheckin => {
            let days = required_days(strategy, days)?;
            checkin_date
                .checked_sub_days(Days::new(days as u64))
                .ok_or_else(|| out_of_range(strategy, days))
        }
        DueTiming::DaysAfterBooking => {
            let days = required_days(strategy, days)?;
            booking_date
                .checked_add_days(Days::new(days as u64))
                .ok_or_else(|| out_of_range(strategy, days))
        }
        DueTiming::SpecificDate => specific_date.ok_or_else(|| {
            ScheduleError::configuration("specific_date strategy requires a specific date")
        }),
    }
}

/// `compute_due_date` for a configured due spec
pub fn due_date_for(
    spec: &DueSpec,
    checkin_date: NaiveDate,
    booking_date: NaiveDate,
) -> Result<NaiveDate> {
    compute_due_date(spec.due, spec.days, checkin_date, booking_date, spec.specific_date)
}

fn required_days(strategy: DueTiming, days: Option<u32>) -> Result<u32> {
    days.ok_or_else(|| {
        ScheduleError::configuration(format!("{} strategy requires days", strategy))
    })
}

fn out_of_range(strategy: DueTiming, days: u32) -> ScheduleError {
    ScheduleError::configuration(format!("{} with {} days is outside the calendar", strategy, days))
}
