mod availability;
mod calendar;
mod conflict;
mod error;
mod mutations;
mod pricing;
mod queries;

pub use availability::{cheapest_per_type, is_free, occupancy_per_room};
pub use calendar::{nights, normalize, stay_span};
pub use error::EngineError;
pub use pricing::{StayPrice, apply_vat, quote, stay_price};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::config::EngineConfig;
use crate::model::*;
use crate::notify::Notifier;
use crate::wal::Wal;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and group-commits appends: block on
/// the first Append, buffer it without syncing, drain whatever else is
/// already queued, then pay for one fsync for the whole batch and answer
/// every waiting caller at once.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Widen the batch with whatever is already queued.
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Settle the in-flight batch before servicing the command.
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // nothing queued, flush what we have
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    respond_batch(batch, &result);
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // A failed append still flushes: the callers were told this batch
    // failed, and its partially buffered bytes must not leak into the next.
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

// ── Engine ───────────────────────────────────────────────

pub struct Engine {
    pub rooms: DashMap<RoomNo, SharedRoomState>,
    /// Full booking records, any status. Occupancy lives in the per-room
    /// slot lists; this map is the system of record.
    pub(super) bookings: DashMap<Ulid, Booking>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<dyn Notifier>,
    pub config: EngineConfig,
}

/// Apply an event to one room's state (no locking — caller holds the lock).
/// Booking events touch only the rooms the booking references.
pub(super) fn apply_to_room(rs: &mut RoomState, event: &Event) {
    match event {
        Event::RoomUpdated { room } => {
            if room.no == rs.room.no {
                rs.room = room.clone();
            }
        }
        Event::RoomDeactivated { no } => {
            if *no == rs.room.no {
                rs.room.active = false;
            }
        }
        Event::BookingCreated { booking } => {
            if booking.status.occupies() && booking.rooms.room_nos().contains(&rs.room.no) {
                rs.insert_slot(BookingSlot {
                    id: booking.id,
                    span: booking.span,
                });
            }
        }
        Event::BookingCancelled { id, .. } => {
            rs.remove_slot(*id);
        }
        Event::BookingRevised { id, rooms, span, .. } => {
            rs.remove_slot(*id);
            if rooms.room_nos().contains(&rs.room.no) {
                rs.insert_slot(BookingSlot { id: *id, span: *span });
            }
        }
        // Status/payment flips don't move occupancy; Completed keeps its
        // slot, and Cancelled arrives as BookingCancelled.
        Event::BookingStatusChanged { .. } | Event::PaymentChanged { .. } => {}
        // Creation/deletion are handled at the room-table level, not here.
        Event::RoomCreated { .. } | Event::RoomDeleted { .. } => {}
    }
}

/// Apply an event to the booking record it references.
pub(super) fn apply_to_record(booking: &mut Booking, event: &Event) {
    match event {
        Event::BookingCancelled { fee, .. } => {
            booking.status = BookingStatus::Cancelled;
            booking.cancellation_fee = Some(*fee);
        }
        Event::BookingRevised {
            rooms,
            span,
            nights,
            price,
            ..
        } => {
            booking.rooms = rooms.clone();
            booking.span = *span;
            booking.nights = *nights;
            booking.price = *price;
        }
        Event::BookingStatusChanged { status, .. } => {
            booking.status = *status;
        }
        Event::PaymentChanged { payment, .. } => {
            booking.payment = *payment;
        }
        _ => {}
    }
}

impl Engine {
    pub fn new(
        wal_path: PathBuf,
        notify: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            rooms: DashMap::new(),
            bookings: DashMap::new(),
            wal_tx,
            notify,
            config,
        };

        for event in &events {
            engine.replay_event(event);
        }

        Ok(engine)
    }

    /// Rebuild state from one replayed event. We are the sole owner of the
    /// room Arcs here, so try_write always succeeds instantly.
    fn replay_event(&self, event: &Event) {
        match event {
            Event::RoomCreated { room } => {
                self.rooms.insert(
                    room.no,
                    Arc::new(RwLock::new(RoomState::new(room.clone()))),
                );
            }
            Event::RoomDeleted { no } => {
                self.rooms.remove(no);
            }
            Event::RoomUpdated { room } => self.replay_to_room(room.no, event),
            Event::RoomDeactivated { no } => self.replay_to_room(*no, event),
            Event::BookingCreated { booking } => {
                for &no in booking.rooms.room_nos() {
                    self.replay_to_room(no, event);
                }
                self.bookings.insert(booking.id, booking.clone());
            }
            Event::BookingCancelled { id, .. } | Event::BookingRevised { id, .. } => {
                // Unhook the old slots wherever the record currently points,
                // then re-apply per the event.
                let old_nos: Vec<RoomNo> = self
                    .bookings
                    .get(id)
                    .map(|b| b.rooms.room_nos().to_vec())
                    .unwrap_or_default();
                let new_nos: Vec<RoomNo> = match event {
                    Event::BookingRevised { rooms, .. } => rooms.room_nos().to_vec(),
                    _ => Vec::new(),
                };
                for no in old_nos.iter().chain(new_nos.iter()) {
                    self.replay_to_room(*no, event);
                }
                if let Some(mut b) = self.bookings.get_mut(id) {
                    apply_to_record(&mut b, event);
                }
            }
            Event::BookingStatusChanged { id, .. } | Event::PaymentChanged { id, .. } => {
                if let Some(mut b) = self.bookings.get_mut(id) {
                    apply_to_record(&mut b, event);
                }
            }
        }
    }

    fn replay_to_room(&self, no: RoomNo, event: &Event) {
        if let Some(entry) = self.rooms.get(&no) {
            let rs = entry.value().clone();
            let mut guard = rs.try_write().expect("replay: uncontended write");
            apply_to_room(&mut guard, event);
        }
    }

    /// Write event to WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_room(&self, no: &RoomNo) -> Option<SharedRoomState> {
        self.rooms.get(no).map(|e| e.value().clone())
    }

    pub fn get_booking(&self, id: &Ulid) -> Option<Booking> {
        self.bookings.get(id).map(|e| e.value().clone())
    }

    /// Compact the WAL to the minimal event set that recreates current
    /// state: every room, then every booking record (slots re-derive from
    /// the records' statuses on replay).
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();

        let room_states: Vec<SharedRoomState> =
            self.rooms.iter().map(|e| e.value().clone()).collect();
        for rs in room_states {
            let guard = rs.read().await;
            events.push(Event::RoomCreated {
                room: guard.room.clone(),
            });
        }
        for entry in self.bookings.iter() {
            events.push(Event::BookingCreated {
                booking: entry.value().clone(),
            });
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
