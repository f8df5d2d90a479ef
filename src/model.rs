use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Currency minor units (cents) — the only money type.
pub type Cents = i64;

/// Room number — the room's identity.
pub type RoomNo = u32;

/// Half-open stay interval `[check_in, check_out)`, whole-day granular.
/// A checkout on day X and a new check-in on day X do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaySpan {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StaySpan {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        debug_assert!(check_in < check_out, "check-in must precede check-out");
        Self {
            check_in,
            check_out,
        }
    }

    /// Truncates the time-of-day component of both endpoints.
    pub fn from_datetimes(check_in: NaiveDateTime, check_out: NaiveDateTime) -> Self {
        Self::new(check_in.date(), check_out.date())
    }

    /// Night count without range validation; see `calendar::nights` for the
    /// checked form.
    pub fn nights_unchecked(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// The single overlap predicate used everywhere.
    pub fn overlaps(&self, other: &StaySpan) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    /// The stay's calendar dates, one per night.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.check_in
            .iter_days()
            .take(self.nights_unchecked().max(0) as usize)
    }
}

/// Room category as presented to guests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Single,
    Double,
    Twin,
    Suite,
    Family,
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Per-weekday nightly price overrides. Fixed seven slots indexed by
/// weekday — not a free-form map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialPrices([Option<Cents>; 7]);

impl SpecialPrices {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(&self, day: Weekday) -> Option<Cents> {
        self.0[day.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, day: Weekday, price: Cents) {
        self.0[day.num_days_from_monday() as usize] = Some(price);
    }

    pub fn clear(&mut self, day: Weekday) {
        self.0[day.num_days_from_monday() as usize] = None;
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Set overrides, in weekday order.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, Cents)> + '_ {
        WEEKDAYS
            .iter()
            .filter_map(|&day| self.get(day).map(|price| (day, price)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub no: RoomNo,
    pub room_type: RoomType,
    /// Nightly price before VAT. Must be positive.
    pub base_price: Cents,
    pub max_occupancy: u32,
    pub special_prices: SpecialPrices,
    /// Deactivated rooms keep their history but take no new bookings.
    pub active: bool,
}

/// The single/multi booking modes are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomSelection {
    Single(RoomNo),
    Multi(Vec<RoomNo>),
}

impl RoomSelection {
    /// Referenced room numbers, in request order (may repeat).
    pub fn room_nos(&self) -> &[RoomNo] {
        match self {
            RoomSelection::Single(no) => std::slice::from_ref(no),
            RoomSelection::Multi(nos) => nos,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, RoomSelection::Multi(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Whether the booking still occupies its interval for overlap checks.
    pub fn occupies(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    /// Whether the booking can still be cancelled, revised or completed.
    pub fn is_open(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

/// Priced stay: VAT calculator output plus the resolver's diagnostics flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: Cents,
    pub vat_rate_percent: i64,
    pub vat_amount: Cents,
    pub total_price: Cents,
    /// True when at least one night used a weekday override.
    pub special_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Generated booking number.
    pub id: Ulid,
    pub rooms: RoomSelection,
    pub span: StaySpan,
    /// Derived from the span; always ≥ 1.
    pub nights: i64,
    pub guest: GuestContact,
    /// Tourist-declared residency status; exempts the booking from VAT.
    pub tourist: bool,
    pub price: PriceBreakdown,
    pub status: BookingStatus,
    pub payment: PaymentStatus,
    /// Set once, on cancellation.
    pub cancellation_fee: Option<Cents>,
}

/// One room's view of a booking: just the interval it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSlot {
    pub id: Ulid,
    pub span: StaySpan,
}

/// Per-room state: attributes plus occupancy slots sorted by check-in.
/// Cancelled bookings have no slot — that is how cancellation excludes
/// them from every future overlap check.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: Room,
    pub slots: Vec<BookingSlot>,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            slots: Vec::new(),
        }
    }

    /// Insert a slot maintaining sort order by check-in.
    pub fn insert_slot(&mut self, slot: BookingSlot) {
        let pos = self
            .slots
            .binary_search_by_key(&slot.span.check_in, |s| s.span.check_in)
            .unwrap_or_else(|e| e);
        self.slots.insert(pos, slot);
    }

    pub fn remove_slot(&mut self, id: Ulid) -> Option<BookingSlot> {
        if let Some(pos) = self.slots.iter().position(|s| s.id == id) {
            Some(self.slots.remove(pos))
        } else {
            None
        }
    }

    /// Slots whose interval overlaps the query span. Binary search skips
    /// slots checking in at or after the query's checkout.
    pub fn overlapping(&self, span: &StaySpan) -> impl Iterator<Item = &BookingSlot> {
        let right_bound = self
            .slots
            .partition_point(|s| s.span.check_in < span.check_out);
        self.slots[..right_bound]
            .iter()
            .filter(move |s| s.span.check_out > span.check_in)
    }
}

/// The event types — this is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomCreated {
        room: Room,
    },
    RoomUpdated {
        room: Room,
    },
    RoomDeactivated {
        no: RoomNo,
    },
    RoomDeleted {
        no: RoomNo,
    },
    BookingCreated {
        booking: Booking,
    },
    BookingCancelled {
        id: Ulid,
        fee: Cents,
    },
    BookingRevised {
        id: Ulid,
        rooms: RoomSelection,
        span: StaySpan,
        nights: i64,
        price: PriceBreakdown,
    },
    BookingStatusChanged {
        id: Ulid,
        status: BookingStatus,
    },
    PaymentChanged {
        id: Ulid,
        payment: PaymentStatus,
    },
}

// ── Booking request & query result types ─────────────────────────

/// Input to booking creation; dates are validated and normalized by the
/// engine, not here.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub rooms: RoomSelection,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest: GuestContact,
    pub tourist: bool,
}

/// One room's row in an aggregated quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomQuote {
    pub room: RoomNo,
    pub room_type: RoomType,
    pub available: bool,
    pub price: PriceBreakdown,
}

/// Aggregated availability/price decision for a set of rooms sharing one
/// candidate interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomsQuote {
    pub all_available: bool,
    pub nights: i64,
    pub base_price: Cents,
    pub vat_amount: Cents,
    pub total_price: Cents,
    pub rooms: Vec<RoomQuote>,
}

/// A search result row, priced for the requested stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub room: RoomNo,
    pub room_type: RoomType,
    pub max_occupancy: u32,
    pub nights: i64,
    pub price: PriceBreakdown,
}

/// Outcome of a cancellation: the updated record and the fee charged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    pub booking: Booking,
    pub fee: Cents,
}

/// Outcome of retiring a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomRetirement {
    /// No current or future bookings — the room was removed outright.
    Deleted,
    /// Future bookings exist — the room was deactivated instead.
    Deactivated,
}
