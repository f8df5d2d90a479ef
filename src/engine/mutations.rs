use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::notify;
use crate::observability::{BOOKING_CONFLICTS_TOTAL, BOOKINGS_CANCELLED_TOTAL, BOOKINGS_CREATED_TOTAL};

use super::conflict::{check_no_conflict, today, validate_span};
use super::{Engine, EngineError, apply_to_record, apply_to_room, calendar, pricing};

fn validate_room(room: &Room) -> Result<(), EngineError> {
    if room.base_price <= 0 {
        return Err(EngineError::Validation("base price must be positive"));
    }
    if room.max_occupancy == 0 {
        return Err(EngineError::Validation("max occupancy must be at least 1"));
    }
    for (_, price) in room.special_prices.iter() {
        if price <= 0 {
            return Err(EngineError::Validation("special price must be positive"));
        }
    }
    Ok(())
}

fn validate_guest(guest: &GuestContact) -> Result<(), EngineError> {
    if guest.first_name.trim().is_empty() {
        return Err(EngineError::Validation("guest first name is required"));
    }
    if guest.last_name.trim().is_empty() {
        return Err(EngineError::Validation("guest last name is required"));
    }
    if guest.first_name.len() > MAX_NAME_LEN || guest.last_name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("guest name too long"));
    }
    if guest.email.trim().is_empty() || !guest.email.contains('@') {
        return Err(EngineError::Validation("guest email is missing or malformed"));
    }
    if guest.phone.trim().is_empty() {
        return Err(EngineError::Validation("guest phone is required"));
    }
    if guest.email.len() > MAX_CONTACT_FIELD_LEN || guest.phone.len() > MAX_CONTACT_FIELD_LEN {
        return Err(EngineError::LimitExceeded("guest contact field too long"));
    }
    Ok(())
}

/// Free when requested `free_days` or more calendar days before check-in;
/// otherwise the full total. No partial tiers.
fn cancellation_fee(booking: &Booking, on: NaiveDate, free_days: i64) -> Cents {
    let days_before = (booking.span.check_in - on).num_days();
    if days_before >= free_days {
        0
    } else {
        booking.price.total_price
    }
}

impl Engine {
    // ── Room lifecycle ───────────────────────────────────────

    pub async fn create_room(&self, room: Room) -> Result<(), EngineError> {
        if self.rooms.len() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        validate_room(&room)?;
        if self.rooms.contains_key(&room.no) {
            return Err(EngineError::AlreadyExists(room.no));
        }

        let event = Event::RoomCreated { room: room.clone() };
        self.wal_append(&event).await?;
        self.rooms
            .insert(room.no, Arc::new(RwLock::new(RoomState::new(room))));
        Ok(())
    }

    /// Replace a room's attributes. The room number is its identity and
    /// cannot change; existing bookings keep their agreed prices.
    pub async fn update_room(&self, room: Room) -> Result<(), EngineError> {
        validate_room(&room)?;
        let rs = self
            .get_room(&room.no)
            .ok_or(EngineError::RoomNotFound(room.no))?;
        let mut guard = rs.write().await;

        let event = Event::RoomUpdated { room };
        self.wal_append(&event).await?;
        apply_to_room(&mut guard, &event);
        Ok(())
    }

    /// Remove a room, or deactivate it when current/future bookings still
    /// reference it. Deactivated rooms keep history but take no new
    /// bookings and never show up in search.
    pub async fn retire_room(&self, no: RoomNo) -> Result<RoomRetirement, EngineError> {
        self.retire_room_on(no, today()).await
    }

    pub async fn retire_room_on(
        &self,
        no: RoomNo,
        on: NaiveDate,
    ) -> Result<RoomRetirement, EngineError> {
        let rs = self.get_room(&no).ok_or(EngineError::RoomNotFound(no))?;
        let mut guard = rs.write().await;

        let has_upcoming = guard.slots.iter().any(|s| s.span.check_out > on);
        if has_upcoming {
            let event = Event::RoomDeactivated { no };
            self.wal_append(&event).await?;
            apply_to_room(&mut guard, &event);
            Ok(RoomRetirement::Deactivated)
        } else {
            let event = Event::RoomDeleted { no };
            self.wal_append(&event).await?;
            drop(guard);
            self.rooms.remove(&no);
            Ok(RoomRetirement::Deleted)
        }
    }

    // ── Booking transaction ──────────────────────────────────

    /// Create a booking, single or multi-room, all-or-nothing.
    ///
    /// The availability check here runs under every referenced room's
    /// write lock — the same locks the slot inserts need. The read-only
    /// pre-check in quotes/search is just UX; this is the gate that
    /// actually closes the check-then-act window.
    pub async fn create_booking(&self, req: BookingRequest) -> Result<Booking, EngineError> {
        validate_guest(&req.guest)?;
        let nights = calendar::nights(req.check_in, req.check_out)?;
        let span = StaySpan::new(req.check_in, req.check_out);
        validate_span(&span)?;

        let room_nos = req.rooms.room_nos();
        if room_nos.is_empty() {
            return Err(EngineError::Validation("booking must reference at least one room"));
        }
        if room_nos.len() > MAX_ROOMS_PER_BOOKING {
            return Err(EngineError::LimitExceeded("too many rooms in one booking"));
        }

        // Acquire write locks in sorted room-number order to prevent deadlocks.
        let mut distinct: Vec<RoomNo> = room_nos.to_vec();
        distinct.sort_unstable();
        distinct.dedup();

        let mut guards = Vec::with_capacity(distinct.len());
        let mut idx: HashMap<RoomNo, usize> = HashMap::with_capacity(distinct.len());
        for no in &distinct {
            let rs = self.get_room(no).ok_or(EngineError::RoomNotFound(*no))?;
            let guard = rs.write_owned().await;
            if !guard.room.active {
                return Err(EngineError::RoomInactive(*no));
            }
            if guard.slots.len() >= MAX_SLOTS_PER_ROOM {
                return Err(EngineError::LimitExceeded("too many bookings on room"));
            }
            idx.insert(*no, guards.len());
            guards.push(guard);
        }

        let id = Ulid::new();

        // Phase 1: validate every room under the locks. A room listed twice
        // would occupy the same interval twice, so it conflicts with itself.
        let mut seen: HashSet<RoomNo> = HashSet::with_capacity(room_nos.len());
        for no in room_nos {
            if let Err(e) = check_no_conflict(&guards[idx[no]], &span, None) {
                metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
                return Err(e);
            }
            if !seen.insert(*no) {
                metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
                return Err(EngineError::RoomUnavailable {
                    room: *no,
                    conflict: id,
                });
            }
        }

        let rate = self.config.vat_rate_percent;
        let mut base_price: Cents = 0;
        let mut vat_amount: Cents = 0;
        let mut total_price: Cents = 0;
        let mut special_applied = false;
        for no in room_nos {
            let p = pricing::quote(&guards[idx[no]].room, &span, req.tourist, rate);
            base_price += p.base_price;
            vat_amount += p.vat_amount;
            total_price += p.total_price;
            special_applied |= p.special_applied;
        }

        let booking = Booking {
            id,
            rooms: req.rooms,
            span,
            nights,
            guest: req.guest,
            tourist: req.tourist,
            price: PriceBreakdown {
                base_price,
                vat_rate_percent: rate,
                vat_amount,
                total_price,
                special_applied,
            },
            status: BookingStatus::Confirmed,
            payment: PaymentStatus::Pending,
            cancellation_fee: None,
        };

        // Phase 2: all validated — commit everywhere.
        let event = Event::BookingCreated {
            booking: booking.clone(),
        };
        self.wal_append(&event).await?;
        for guard in &mut guards {
            apply_to_room(guard, &event);
        }
        self.bookings.insert(id, booking.clone());
        drop(guards);

        metrics::counter!(BOOKINGS_CREATED_TOTAL).increment(1);
        notify::dispatch_booking_created(self.notify.as_ref(), &booking).await;
        Ok(booking)
    }

    /// Cancel as of today. See `cancel_booking_on` for the fee policy.
    pub async fn cancel_booking(&self, id: Ulid) -> Result<Cancellation, EngineError> {
        self.cancel_booking_on(id, today()).await
    }

    /// Cancel a booking as of a given date. The record survives with
    /// status Cancelled; its interval is released on every room at once —
    /// multi-room bookings cancel all-or-nothing.
    pub async fn cancel_booking_on(
        &self,
        id: Ulid,
        on: NaiveDate,
    ) -> Result<Cancellation, EngineError> {
        let booking = self.get_booking(&id).ok_or(EngineError::BookingNotFound(id))?;
        if !booking.status.is_open() {
            return Err(EngineError::InvalidStatus {
                id,
                status: booking.status,
            });
        }

        let mut nos: Vec<RoomNo> = booking.rooms.room_nos().to_vec();
        nos.sort_unstable();
        nos.dedup();
        let mut guards = Vec::with_capacity(nos.len());
        for no in &nos {
            // A room retired after the stay ended may already be gone;
            // there is no slot left to release on it.
            if let Some(rs) = self.get_room(no) {
                guards.push(rs.write_owned().await);
            }
        }

        // Re-check under the locks — a concurrent cancel may have won.
        let current = self.get_booking(&id).ok_or(EngineError::BookingNotFound(id))?;
        if !current.status.is_open() {
            return Err(EngineError::InvalidStatus {
                id,
                status: current.status,
            });
        }

        let fee = cancellation_fee(&current, on, self.config.free_cancellation_days);
        let event = Event::BookingCancelled { id, fee };
        self.wal_append(&event).await?;
        for guard in &mut guards {
            apply_to_room(guard, &event);
        }
        let updated = {
            let mut entry = self
                .bookings
                .get_mut(&id)
                .ok_or(EngineError::BookingNotFound(id))?;
            apply_to_record(&mut entry, &event);
            entry.clone()
        };
        drop(guards);

        metrics::counter!(BOOKINGS_CANCELLED_TOTAL).increment(1);
        notify::dispatch_cancellation(self.notify.as_ref(), &updated, fee).await;
        Ok(Cancellation {
            booking: updated,
            fee,
        })
    }

    /// Change a booking's dates and/or rooms. Availability is re-validated
    /// under the write locks of the union of old and new rooms, excluding
    /// the booking's own record; the price is recomputed; only then does
    /// the mutation commit.
    pub async fn revise_booking(
        &self,
        id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        new_rooms: Option<RoomSelection>,
    ) -> Result<Booking, EngineError> {
        let booking = self.get_booking(&id).ok_or(EngineError::BookingNotFound(id))?;
        if !booking.status.is_open() {
            return Err(EngineError::InvalidStatus {
                id,
                status: booking.status,
            });
        }

        let nights = calendar::nights(check_in, check_out)?;
        let span = StaySpan::new(check_in, check_out);
        validate_span(&span)?;

        let rooms = new_rooms.unwrap_or_else(|| booking.rooms.clone());
        let target_nos = rooms.room_nos();
        if target_nos.is_empty() {
            return Err(EngineError::Validation("booking must reference at least one room"));
        }
        if target_nos.len() > MAX_ROOMS_PER_BOOKING {
            return Err(EngineError::LimitExceeded("too many rooms in one booking"));
        }

        // Lock the union of old and new rooms, sorted.
        let mut union: Vec<RoomNo> = booking
            .rooms
            .room_nos()
            .iter()
            .chain(target_nos.iter())
            .copied()
            .collect();
        union.sort_unstable();
        union.dedup();

        let mut guards = Vec::with_capacity(union.len());
        let mut idx: HashMap<RoomNo, usize> = HashMap::with_capacity(union.len());
        for no in &union {
            match self.get_room(no) {
                Some(rs) => {
                    let guard = rs.write_owned().await;
                    if target_nos.contains(no) {
                        if !guard.room.active {
                            return Err(EngineError::RoomInactive(*no));
                        }
                        if guard.slots.len() >= MAX_SLOTS_PER_ROOM {
                            return Err(EngineError::LimitExceeded("too many bookings on room"));
                        }
                    }
                    idx.insert(*no, guards.len());
                    guards.push(guard);
                }
                None if target_nos.contains(no) => {
                    return Err(EngineError::RoomNotFound(*no));
                }
                // An already-retired old room has nothing left to unhook.
                None => {}
            }
        }

        let current = self.get_booking(&id).ok_or(EngineError::BookingNotFound(id))?;
        if !current.status.is_open() {
            return Err(EngineError::InvalidStatus {
                id,
                status: current.status,
            });
        }

        let mut seen: HashSet<RoomNo> = HashSet::with_capacity(target_nos.len());
        for no in target_nos {
            if let Err(e) = check_no_conflict(&guards[idx[no]], &span, Some(id)) {
                metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
                return Err(e);
            }
            if !seen.insert(*no) {
                metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
                return Err(EngineError::RoomUnavailable {
                    room: *no,
                    conflict: id,
                });
            }
        }

        let rate = self.config.vat_rate_percent;
        let mut base_price: Cents = 0;
        let mut vat_amount: Cents = 0;
        let mut total_price: Cents = 0;
        let mut special_applied = false;
        for no in target_nos {
            let p = pricing::quote(&guards[idx[no]].room, &span, current.tourist, rate);
            base_price += p.base_price;
            vat_amount += p.vat_amount;
            total_price += p.total_price;
            special_applied |= p.special_applied;
        }

        let event = Event::BookingRevised {
            id,
            rooms: rooms.clone(),
            span,
            nights,
            price: PriceBreakdown {
                base_price,
                vat_rate_percent: rate,
                vat_amount,
                total_price,
                special_applied,
            },
        };
        self.wal_append(&event).await?;
        for guard in &mut guards {
            apply_to_room(guard, &event);
        }
        let updated = {
            let mut entry = self
                .bookings
                .get_mut(&id)
                .ok_or(EngineError::BookingNotFound(id))?;
            apply_to_record(&mut entry, &event);
            entry.clone()
        };
        Ok(updated)
    }

    /// Mark a stay as completed (back-office action after checkout).
    pub async fn complete_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let booking = self.get_booking(&id).ok_or(EngineError::BookingNotFound(id))?;
        if !booking.status.is_open() {
            return Err(EngineError::InvalidStatus {
                id,
                status: booking.status,
            });
        }

        let event = Event::BookingStatusChanged {
            id,
            status: BookingStatus::Completed,
        };
        self.wal_append(&event).await?;
        let mut entry = self
            .bookings
            .get_mut(&id)
            .ok_or(EngineError::BookingNotFound(id))?;
        apply_to_record(&mut entry, &event);
        Ok(entry.clone())
    }

    pub async fn set_payment_status(
        &self,
        id: Ulid,
        payment: PaymentStatus,
    ) -> Result<Booking, EngineError> {
        let booking = self.get_booking(&id).ok_or(EngineError::BookingNotFound(id))?;
        if booking.status == BookingStatus::Cancelled {
            return Err(EngineError::InvalidStatus {
                id,
                status: booking.status,
            });
        }

        let event = Event::PaymentChanged { id, payment };
        self.wal_append(&event).await?;
        let mut entry = self
            .bookings
            .get_mut(&id)
            .ok_or(EngineError::BookingNotFound(id))?;
        apply_to_record(&mut entry, &event);
        Ok(entry.clone())
    }
}
