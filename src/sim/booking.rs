//! Booking windows and admission validation.
//!
//! Window overlap checking and request validation are pure functions over
//! the data model; the engine applies their results to slot state.

use serde::Serialize;
use thiserror::Error;

use crate::facility::SlotStateError;

/// Rejection reasons for booking and walk-in admission.
///
/// Every variant is recovered locally: the request is refused and no state
/// is mutated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("slot {slot_id} is reserve-only and cannot be booked in advance")]
    SlotUnbookable { slot_id: u32 },
    #[error("slot {slot_id} already has a confirmed booking overlapping the requested window")]
    WindowConflict { slot_id: u32 },
    #[error("invalid booking window: {reason}")]
    InvalidWindow { reason: &'static str },
    #[error("slot {slot_id} accepts advance bookings, not walk-ins")]
    NotWalkIn { slot_id: u32 },
    #[error("slot {slot_id} is currently occupied")]
    SlotOccupied { slot_id: u32 },
    #[error("slot {slot_id} does not exist in this facility")]
    UnknownSlot { slot_id: u32 },
    #[error("customer {customer_id} is not registered")]
    UnknownCustomer { customer_id: String },
}

impl From<SlotStateError> for AdmissionError {
    fn from(err: SlotStateError) -> Self {
        match err {
            SlotStateError::NotBookable { slot_id } => AdmissionError::SlotUnbookable { slot_id },
            SlotStateError::NotWalkIn { slot_id } => AdmissionError::NotWalkIn { slot_id },
            SlotStateError::InvalidTransition { slot_id, .. } => {
                AdmissionError::SlotOccupied { slot_id }
            }
        }
    }
}

/// Half-open interval overlap: `[a_start, a_end)` against `[b_start, b_end)`.
/// Windows that merely touch do not overlap.
pub fn windows_overlap(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    a_start < b_end && b_start < a_end
}

/// A reservation request as submitted by a collaborator.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub customer_id: String,
    pub slot_id: u32,
    /// Window start (tick index).
    pub start: usize,
    /// Window length in ticks (> 0).
    pub duration: usize,
    /// V2G discharge consent for this session.
    pub grid_support: bool,
    /// Optional hard departure deadline; must fall after `start`.
    pub departure_tick: Option<usize>,
}

impl BookingRequest {
    /// Exclusive window end tick.
    pub fn end(&self) -> usize {
        self.start + self.duration
    }

    /// Validates the window shape alone (no slot or ledger access).
    pub fn validate(&self) -> Result<(), AdmissionError> {
        if self.duration == 0 {
            return Err(AdmissionError::InvalidWindow {
                reason: "duration must be at least one tick",
            });
        }
        if let Some(dep) = self.departure_tick {
            if dep <= self.start {
                return Err(AdmissionError::InvalidWindow {
                    reason: "departure must fall after the window start",
                });
            }
        }
        Ok(())
    }
}

/// A confirmed booking held in the engine's ledger.
#[derive(Debug, Clone, Serialize)]
pub struct BookingWindow {
    pub customer_id: String,
    pub slot_id: u32,
    pub start: usize,
    pub duration: usize,
    pub grid_support: bool,
    pub departure_tick: Option<usize>,
    /// Set once the vehicle has arrived and the session is live.
    pub active: bool,
}

impl BookingWindow {
    /// Creates a confirmed window from a validated request.
    pub fn confirm(request: &BookingRequest) -> Self {
        Self {
            customer_id: request.customer_id.clone(),
            slot_id: request.slot_id,
            start: request.start,
            duration: request.duration,
            grid_support: request.grid_support,
            departure_tick: request.departure_tick,
            active: false,
        }
    }

    /// Exclusive window end tick.
    pub fn end(&self) -> usize {
        self.start + self.duration
    }

    /// The departure deadline used for safety projection and auto-checkout:
    /// the explicit deadline when given, otherwise the window end.
    pub fn effective_departure(&self) -> usize {
        self.departure_tick.unwrap_or_else(|| self.end())
    }

    /// Whether this window overlaps the half-open interval `[start, end)`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        windows_overlap(self.start, self.end(), start, end)
    }
}

/// Confirmation returned to the caller on successful admission.
#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub customer_id: String,
    pub slot_id: u32,
    pub start: usize,
    pub end: usize,
    pub departure_tick: Option<usize>,
}
