use async_trait::async_trait;
use tracing::{info, warn};

use crate::model::{Booking, Cents};

/// Failure inside a notification transport. Never escalated past the
/// dispatch helpers below.
#[derive(Debug)]
pub struct NotifyError(pub String);

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Outbound notification collaborator: guest confirmation mail, admin
/// alert mail, cancellation alert. Implementations own the transport;
/// the engine treats every call as best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmation(&self, booking: &Booking) -> Result<(), NotifyError>;

    async fn admin_booking_alert(&self, booking: &Booking) -> Result<(), NotifyError>;

    async fn cancellation_alert(&self, booking: &Booking, fee: Cents) -> Result<(), NotifyError>;
}

/// Default collaborator: writes the would-be messages to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmation(&self, booking: &Booking) -> Result<(), NotifyError> {
        info!(
            booking = %booking.id,
            guest = %booking.guest.email,
            total = booking.price.total_price,
            "booking confirmation"
        );
        Ok(())
    }

    async fn admin_booking_alert(&self, booking: &Booking) -> Result<(), NotifyError> {
        info!(booking = %booking.id, rooms = ?booking.rooms.room_nos(), "new booking");
        Ok(())
    }

    async fn cancellation_alert(&self, booking: &Booking, fee: Cents) -> Result<(), NotifyError> {
        info!(booking = %booking.id, fee, "booking cancelled");
        Ok(())
    }
}

/// Guest confirmation + admin alert after a committed booking. Failures
/// are logged and counted, never propagated — the booking already stands.
pub(crate) async fn dispatch_booking_created(notify: &dyn Notifier, booking: &Booking) {
    if let Err(e) = notify.booking_confirmation(booking).await {
        metrics::counter!(crate::observability::NOTIFY_FAILURES_TOTAL).increment(1);
        warn!(booking = %booking.id, "guest confirmation failed: {e}");
    }
    if let Err(e) = notify.admin_booking_alert(booking).await {
        metrics::counter!(crate::observability::NOTIFY_FAILURES_TOTAL).increment(1);
        warn!(booking = %booking.id, "admin alert failed: {e}");
    }
}

/// Cancellation alert after a committed cancellation. Same best-effort
/// contract as above.
pub(crate) async fn dispatch_cancellation(notify: &dyn Notifier, booking: &Booking, fee: Cents) {
    if let Err(e) = notify.cancellation_alert(booking, fee).await {
        metrics::counter!(crate::observability::NOTIFY_FAILURES_TOTAL).increment(1);
        warn!(booking = %booking.id, "cancellation alert failed: {e}");
    }
}
