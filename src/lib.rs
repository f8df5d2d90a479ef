//! Hotel room availability, pricing and booking engine.
//!
//! The engine owns the hard logic — overlap detection, nightly price
//! composition with weekday overrides, conditional VAT, and the atomic
//! multi-room booking transaction. Routing, auth, mail transport and UI
//! live elsewhere and talk to the [`Engine`] through its async API and
//! the [`notify::Notifier`] seam.

pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod wal;

pub use config::EngineConfig;
pub use engine::{Engine, EngineError};
pub use model::{
    Booking, BookingRequest, BookingStatus, Cancellation, Cents, GuestContact, PaymentStatus,
    PriceBreakdown, Room, RoomNo, RoomQuote, RoomRetirement, RoomSelection, RoomType, RoomsQuote,
    SearchHit, SpecialPrices, StaySpan,
};
pub use notify::{LogNotifier, Notifier, NotifyError};
