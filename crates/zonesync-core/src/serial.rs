// # Zone serial numbers
//
// Two serial styles are recognised:
//
// 1. Plain counters: 1 -> 2 -> 3
// 2. Date-based `YYYYMMDDnn`: 2022123004 -> 2022123005 -> 2022123100
//
// Anything at or above 2000010100 (the first date-based serial of the year
// 2000) is treated as date-based. If the serial already starts with today's
// date it is bumped by one; otherwise it restarts at `today * 100`.
//
// The new serial must be strictly greater than the old one. Secondaries only
// pick up changes when the serial grows, so a date in the future is an error
// rather than something to paper over. After 100 changes in one day the
// revision digits spill into the date (2022123099 -> 2022123100), and the
// next change fails until the calendar catches up.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use tracing::debug;

/// Smallest serial treated as `YYYYMMDDnn`
pub const DATE_SERIAL_THRESHOLD: u32 = 2_000_010_100;

/// Compute the next serial for a zone changed on `today`
pub fn increment_serial(current: u32, today: NaiveDate) -> Result<u32> {
    if current < DATE_SERIAL_THRESHOLD {
        debug!("Incrementing counter serial {}", current);
        return Ok(current + 1);
    }

    let today = today.format("%Y%m%d").to_string();

    if current.to_string().starts_with(&today) {
        debug!("Serial {} already dated {}, bumping revision", current, today);
        return current.checked_add(1).ok_or(Error::SerialRegression {
            current,
            proposed: u64::from(current) + 1,
        });
    }

    let day: u64 = today
        .parse()
        .map_err(|_| Error::invalid_input(format!("Date {} cannot form a serial", today)))?;
    let proposed = day * 100;

    if proposed <= u64::from(current) {
        return Err(Error::SerialRegression { current, proposed });
    }

    debug!("Starting new date-based serial {} (was {})", proposed, current);
    u32::try_from(proposed)
        .map_err(|_| Error::invalid_input(format!("Serial {} does not fit in 32 bits", proposed)))
}

/// Compute the next serial using the local calendar date
pub fn increment_serial_today(current: u32) -> Result<u32> {
    increment_serial(current, chrono::Local::now().date_naive())
}
