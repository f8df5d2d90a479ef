use std::collections::HashSet;

use crate::model::{RoomState, SearchHit, StaySpan};

// ── Availability predicates ───────────────────────────────────────

/// A room is free for a candidate interval iff no occupying slot overlaps
/// it. Cancelled bookings never appear in the slot list.
pub fn is_free(rs: &RoomState, span: &StaySpan) -> bool {
    rs.overlapping(span).next().is_none()
}

/// Guests each room must sleep when a party of `guests` is split across
/// `rooms` rooms.
pub fn occupancy_per_room(guests: u32, rooms: u32) -> u32 {
    guests.div_ceil(rooms.max(1))
}

// ── Search post-filters ───────────────────────────────────────────

/// De-duplicate a price-sorted hit list down to the cheapest room of each
/// room type. Applied only to single-room searches for 1–2 guests, where
/// near-identical options would flood the guest.
pub fn cheapest_per_type(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.room_type))
        .collect()
}
