use chrono::{NaiveDate, NaiveDateTime};

use crate::model::StaySpan;

use super::EngineError;

/// Night count for a stay. Both endpoints are whole days; datetime input
/// goes through `normalize` first. Fails when check-out is not strictly
/// after check-in.
pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> Result<i64, EngineError> {
    let n = (check_out - check_in).num_days();
    if n <= 0 {
        return Err(EngineError::InvalidRange {
            check_in,
            check_out,
        });
    }
    Ok(n)
}

/// Truncate a timestamp to its date component (midnight boundary).
pub fn normalize(ts: NaiveDateTime) -> NaiveDate {
    ts.date()
}

/// Validated span constructor: `nights ≥ 1` or `InvalidRange`.
pub fn stay_span(check_in: NaiveDate, check_out: NaiveDate) -> Result<StaySpan, EngineError> {
    nights(check_in, check_out)?;
    Ok(StaySpan::new(check_in, check_out))
}
