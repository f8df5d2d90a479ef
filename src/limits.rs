//! Hard limits. These are not tunable per deployment — they bound memory
//! and WAL growth regardless of configuration.

/// Maximum number of rooms a property may define.
pub const MAX_ROOMS: usize = 10_000;

/// Maximum occupancy slots (non-cancelled bookings) per room.
pub const MAX_SLOTS_PER_ROOM: usize = 100_000;

/// Maximum rooms referenced by a single multi-room booking.
pub const MAX_ROOMS_PER_BOOKING: usize = 16;

/// Maximum room ids accepted by one quote request.
pub const MAX_QUOTE_ROOMS: usize = 64;

/// Longest bookable stay, in nights.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// Stay dates must fall inside this year window.
pub const MIN_STAY_YEAR: i32 = 2000;
pub const MAX_STAY_YEAR: i32 = 2100;

/// Maximum length of a guest name field.
pub const MAX_NAME_LEN: usize = 128;

/// Maximum length of a guest email or phone field.
pub const MAX_CONTACT_FIELD_LEN: usize = 254;
