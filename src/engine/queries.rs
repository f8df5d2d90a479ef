use futures::future::{join_all, try_join_all};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::{AVAILABILITY_CHECKS_TOTAL, SEARCHES_TOTAL};

use super::availability::{cheapest_per_type, is_free, occupancy_per_room};
use super::conflict::validate_span;
use super::{Engine, EngineError, SharedRoomState, pricing};

impl Engine {
    /// Single-room availability: free iff no non-cancelled booking of this
    /// room overlaps the candidate interval. Read-only — the authoritative
    /// re-check happens under the write lock at persist time.
    pub async fn check_room(&self, no: RoomNo, span: &StaySpan) -> Result<bool, EngineError> {
        validate_span(span)?;
        metrics::counter!(AVAILABILITY_CHECKS_TOTAL).increment(1);
        let rs = self.get_room(&no).ok_or(EngineError::RoomNotFound(no))?;
        let guard = rs.read().await;
        Ok(is_free(&guard, span))
    }

    /// Aggregated availability/price decision for an explicit room list
    /// sharing one candidate interval. Any unknown room fails the whole
    /// call — no silent skips.
    pub async fn quote_rooms(
        &self,
        room_nos: &[RoomNo],
        span: &StaySpan,
        tourist: bool,
    ) -> Result<RoomsQuote, EngineError> {
        validate_span(span)?;
        if room_nos.is_empty() {
            return Err(EngineError::Validation("at least one room required"));
        }
        if room_nos.len() > MAX_QUOTE_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms in one quote"));
        }
        let rate = self.config.vat_rate_percent;

        // Per-room sub-checks are read-only and order-independent — fan out.
        let checks = room_nos.iter().map(|&no| async move {
            let rs = self.get_room(&no).ok_or(EngineError::RoomNotFound(no))?;
            let guard = rs.read().await;
            Ok::<RoomQuote, EngineError>(RoomQuote {
                room: no,
                room_type: guard.room.room_type,
                available: guard.room.active && is_free(&guard, span),
                price: pricing::quote(&guard.room, span, tourist, rate),
            })
        });
        let rooms = try_join_all(checks).await?;

        let all_available = rooms.iter().all(|q| q.available);
        let base_price = rooms.iter().map(|q| q.price.base_price).sum();
        let vat_amount = rooms.iter().map(|q| q.price.vat_amount).sum();
        let total_price = rooms.iter().map(|q| q.price.total_price).sum();

        Ok(RoomsQuote {
            all_available,
            nights: span.nights_unchecked(),
            base_price,
            vat_amount,
            total_price,
            rooms,
        })
    }

    /// The "N identical rooms" form: quote one room repeated `count` times.
    /// Useful for pricing a party that wants several of the same room;
    /// actually *booking* the same room twice for one interval will
    /// self-conflict at the write.
    pub async fn quote_repeated(
        &self,
        no: RoomNo,
        count: u32,
        span: &StaySpan,
        tourist: bool,
    ) -> Result<RoomsQuote, EngineError> {
        if count == 0 {
            return Err(EngineError::Validation("rooms count must be at least 1"));
        }
        if count as usize > MAX_QUOTE_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms in one quote"));
        }
        let nos = vec![no; count as usize];
        self.quote_rooms(&nos, span, tourist).await
    }

    /// Guest-facing search: all active rooms that can sleep the party's
    /// per-room share and are free for the interval, priced and sorted
    /// ascending by total. Single-room searches for 1–2 guests collapse to
    /// the cheapest room of each type.
    pub async fn search(
        &self,
        span: &StaySpan,
        guests: u32,
        rooms_wanted: u32,
        tourist: bool,
    ) -> Result<Vec<SearchHit>, EngineError> {
        validate_span(span)?;
        if guests == 0 {
            return Err(EngineError::Validation("guest count must be at least 1"));
        }
        if rooms_wanted == 0 {
            return Err(EngineError::Validation("rooms count must be at least 1"));
        }
        metrics::counter!(SEARCHES_TOTAL).increment(1);

        let needed = occupancy_per_room(guests, rooms_wanted);
        let rate = self.config.vat_rate_percent;
        let nights = span.nights_unchecked();

        // Snapshot the room set, then scan without touching the map.
        let candidates: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        let checks = candidates.iter().map(|rs| async move {
            let guard = rs.read().await;
            if !guard.room.active || guard.room.max_occupancy < needed {
                return None;
            }
            if !is_free(&guard, span) {
                return None;
            }
            Some(SearchHit {
                room: guard.room.no,
                room_type: guard.room.room_type,
                max_occupancy: guard.room.max_occupancy,
                nights,
                price: pricing::quote(&guard.room, span, tourist, rate),
            })
        });
        let mut hits: Vec<SearchHit> = join_all(checks).await.into_iter().flatten().collect();

        hits.sort_by(|a, b| {
            a.price
                .total_price
                .cmp(&b.price.total_price)
                .then(a.room.cmp(&b.room))
        });

        if rooms_wanted == 1 && guests <= 2 {
            hits = cheapest_per_type(hits);
        }
        Ok(hits)
    }

    /// All rooms, active and deactivated, sorted by number.
    pub async fn list_rooms(&self) -> Vec<Room> {
        let states: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut rooms = Vec::with_capacity(states.len());
        for rs in states {
            rooms.push(rs.read().await.room.clone());
        }
        rooms.sort_by_key(|r| r.no);
        rooms
    }

    /// All non-cancelled bookings referencing a room, ordered by check-in.
    pub async fn bookings_for_room(&self, no: RoomNo) -> Result<Vec<Booking>, EngineError> {
        let rs = self.get_room(&no).ok_or(EngineError::RoomNotFound(no))?;
        let ids: Vec<Ulid> = {
            let guard = rs.read().await;
            guard.slots.iter().map(|s| s.id).collect()
        };
        Ok(ids.into_iter().filter_map(|id| self.get_booking(&id)).collect())
    }

    /// Non-cancelled bookings of a room overlapping the given interval.
    pub async fn overlapping_bookings(
        &self,
        no: RoomNo,
        span: &StaySpan,
    ) -> Result<Vec<Booking>, EngineError> {
        let rs = self.get_room(&no).ok_or(EngineError::RoomNotFound(no))?;
        let ids: Vec<Ulid> = {
            let guard = rs.read().await;
            guard.overlapping(span).map(|s| s.id).collect()
        };
        Ok(ids.into_iter().filter_map(|id| self.get_booking(&id)).collect())
    }
}
