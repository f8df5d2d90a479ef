use chrono::{Datelike, NaiveDate};
use ulid::Ulid;

use crate::limits::*;
use crate::model::{RoomState, StaySpan};

use super::EngineError;

pub(crate) fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

pub(crate) fn validate_span(span: &StaySpan) -> Result<(), EngineError> {
    let nights = span.nights_unchecked();
    if nights <= 0 {
        return Err(EngineError::InvalidRange {
            check_in: span.check_in,
            check_out: span.check_out,
        });
    }
    if nights > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    if span.check_in.year() < MIN_STAY_YEAR || span.check_out.year() > MAX_STAY_YEAR {
        return Err(EngineError::LimitExceeded("stay date out of range"));
    }
    Ok(())
}

/// Reject the candidate interval if any occupying slot overlaps it.
///
/// Run under the room's write lock this is the authoritative gate against
/// double booking: the check and the insert are serialized by the same
/// lock, so racing writers cannot both pass. `exclude` skips the booking's
/// own slot when revising an existing booking.
pub(crate) fn check_no_conflict(
    rs: &RoomState,
    span: &StaySpan,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    for slot in rs.overlapping(span) {
        if exclude == Some(slot.id) {
            continue;
        }
        return Err(EngineError::RoomUnavailable {
            room: rs.room.no,
            conflict: slot.id,
        });
    }
    Ok(())
}
