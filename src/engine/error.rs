use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{BookingStatus, RoomNo};

#[derive(Debug)]
pub enum EngineError {
    /// Check-out is not strictly after check-in.
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    RoomNotFound(RoomNo),
    RoomInactive(RoomNo),
    AlreadyExists(RoomNo),
    BookingNotFound(Ulid),
    /// Overlap detected — at the pre-check or at the authoritative write.
    RoomUnavailable {
        room: RoomNo,
        conflict: Ulid,
    },
    /// The booking's lifecycle status forbids the requested transition.
    InvalidStatus {
        id: Ulid,
        status: BookingStatus,
    },
    Validation(&'static str),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRange {
                check_in,
                check_out,
            } => {
                write!(f, "invalid date range: [{check_in}, {check_out})")
            }
            EngineError::RoomNotFound(no) => write!(f, "room not found: {no}"),
            EngineError::RoomInactive(no) => write!(f, "room is inactive: {no}"),
            EngineError::AlreadyExists(no) => write!(f, "room already exists: {no}"),
            EngineError::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            EngineError::RoomUnavailable { room, conflict } => {
                write!(f, "room {room} unavailable: conflicts with booking {conflict}")
            }
            EngineError::InvalidStatus { id, status } => {
                write!(f, "booking {id} is {status}: transition not allowed")
            }
            EngineError::Validation(msg) => write!(f, "validation failed: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
