//! Physical charging slot records and their lifecycle state machine.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Lifecycle state of a physical slot.
///
/// The set is closed; every transition helper matches all six variants
/// explicitly so a new state cannot be added without revisiting each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotStatus {
    Available,
    Booked,
    Charging,
    Discharging,
    OnSite,
    MandatoryCharging,
}

impl SlotStatus {
    /// Stable lowercase label used in reports and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Booked => "booked",
            SlotStatus::Charging => "charging",
            SlotStatus::Discharging => "discharging",
            SlotStatus::OnSite => "on-site",
            SlotStatus::MandatoryCharging => "mandatory-charging",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected slot state transition. State is left unchanged on every error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotStateError {
    #[error("slot {slot_id} is reserve-only and cannot be booked")]
    NotBookable { slot_id: u32 },
    #[error("slot {slot_id} accepts advance bookings, not walk-ins")]
    NotWalkIn { slot_id: u32 },
    #[error("slot {slot_id} is {status} and cannot accept this transition")]
    InvalidTransition { slot_id: u32, status: SlotStatus },
}

/// A physical charging bay.
///
/// Slots are created once at facility initialization with fixed ids and
/// persist for the run; only the mutable session fields change. The occupant
/// fields (`vehicle_id`, `soc`) are present iff a vehicle is physically or
/// contractually attached, and absent iff the slot is `Available`.
#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    /// Fixed slot id, unique within the facility (1..=N).
    pub id: u32,
    pub status: SlotStatus,
    /// Reserve-only slots (`false`) never enter `Booked`; they serve
    /// walk-ins and grid-dedicated sessions only.
    pub is_bookable: bool,
    /// Plate of the occupying vehicle, present iff occupied.
    pub vehicle_id: Option<String>,
    /// State of charge of the occupying vehicle, in [0, 1].
    pub soc: Option<f32>,
    /// Confirmed booking window start (tick index).
    pub booking_start: Option<usize>,
    /// Confirmed booking window length (ticks).
    pub booking_duration: Option<usize>,
    /// Hard deadline by which the vehicle must reach the minimum SoC.
    pub departure_tick: Option<usize>,
    /// V2G consent recorded for the current session. Only observable
    /// through [`Slot::grid_support`], which is true solely while
    /// discharging.
    #[serde(skip)]
    consent: bool,
}

impl Slot {
    /// Creates a vacant slot.
    pub fn new(id: u32, is_bookable: bool) -> Self {
        Self {
            id,
            status: SlotStatus::Available,
            is_bookable,
            vehicle_id: None,
            soc: None,
            booking_start: None,
            booking_duration: None,
            departure_tick: None,
            consent: false,
        }
    }

    /// Whether a vehicle currently occupies the slot.
    pub fn is_occupied(&self) -> bool {
        self.vehicle_id.is_some()
    }

    /// V2G grid-support flag: true only while the slot is discharging and
    /// the session recorded consent. Recorded consent in any other state is
    /// a latent configuration value, not an active flag.
    pub fn grid_support(&self) -> bool {
        self.status == SlotStatus::Discharging && self.consent
    }

    /// Whether this session recorded discharge consent.
    pub(crate) fn consent(&self) -> bool {
        self.consent
    }

    /// Confirms a reservation: `Available` -> `Booked`.
    ///
    /// Window validity (duration, departure ordering, overlap against other
    /// confirmed windows) is the admission scheduler's responsibility; this
    /// method guards only the state machine.
    pub fn book(
        &mut self,
        start: usize,
        duration: usize,
        departure_tick: Option<usize>,
        consent: bool,
    ) -> Result<(), SlotStateError> {
        match self.status {
            SlotStatus::Available => {
                if !self.is_bookable {
                    return Err(SlotStateError::NotBookable { slot_id: self.id });
                }
                self.status = SlotStatus::Booked;
                self.booking_start = Some(start);
                self.booking_duration = Some(duration);
                self.departure_tick = departure_tick;
                self.consent = consent;
                Ok(())
            }
            SlotStatus::Booked
            | SlotStatus::Charging
            | SlotStatus::Discharging
            | SlotStatus::OnSite
            | SlotStatus::MandatoryCharging => Err(SlotStateError::InvalidTransition {
                slot_id: self.id,
                status: self.status,
            }),
        }
    }

    /// Repoints a `Booked` slot at a different confirmed window: a slot may
    /// hold several queued windows in the ledger, and the one being
    /// activated is not necessarily the one whose fields were recorded at
    /// admission. Replaces the window fields, deadline, and consent.
    pub(crate) fn retarget_window(
        &mut self,
        start: usize,
        duration: usize,
        departure_tick: Option<usize>,
        consent: bool,
    ) -> Result<(), SlotStateError> {
        match self.status {
            SlotStatus::Booked => {
                self.booking_start = Some(start);
                self.booking_duration = Some(duration);
                self.departure_tick = departure_tick;
                self.consent = consent;
                Ok(())
            }
            SlotStatus::Available
            | SlotStatus::Charging
            | SlotStatus::Discharging
            | SlotStatus::OnSite
            | SlotStatus::MandatoryCharging => Err(SlotStateError::InvalidTransition {
                slot_id: self.id,
                status: self.status,
            }),
        }
    }

    /// Vehicle arrival for a confirmed booking: `Booked` -> `OnSite`.
    pub fn arrive(&mut self, vehicle_id: String, soc: f32) -> Result<(), SlotStateError> {
        match self.status {
            SlotStatus::Booked => {
                self.status = SlotStatus::OnSite;
                self.vehicle_id = Some(vehicle_id);
                self.soc = Some(soc.clamp(0.0, 1.0));
                Ok(())
            }
            SlotStatus::Available
            | SlotStatus::Charging
            | SlotStatus::Discharging
            | SlotStatus::OnSite
            | SlotStatus::MandatoryCharging => Err(SlotStateError::InvalidTransition {
                slot_id: self.id,
                status: self.status,
            }),
        }
    }

    /// Direct walk-in occupancy on a reserve-only slot:
    /// `Available` -> `OnSite`, bypassing the booking ledger.
    pub fn occupy_walk_in(
        &mut self,
        vehicle_id: String,
        soc: f32,
        departure_tick: Option<usize>,
        consent: bool,
    ) -> Result<(), SlotStateError> {
        match self.status {
            SlotStatus::Available => {
                if self.is_bookable {
                    return Err(SlotStateError::NotWalkIn { slot_id: self.id });
                }
                self.status = SlotStatus::OnSite;
                self.vehicle_id = Some(vehicle_id);
                self.soc = Some(soc.clamp(0.0, 1.0));
                self.departure_tick = departure_tick;
                self.consent = consent;
                Ok(())
            }
            SlotStatus::Booked
            | SlotStatus::Charging
            | SlotStatus::Discharging
            | SlotStatus::OnSite
            | SlotStatus::MandatoryCharging => Err(SlotStateError::InvalidTransition {
                slot_id: self.id,
                status: self.status,
            }),
        }
    }

    /// Per-tick dispatch transition between the occupied power states.
    ///
    /// Valid targets are `Charging`, `Discharging`, `OnSite` (hold), and
    /// `MandatoryCharging`. `MandatoryCharging` is sticky: once entered, the
    /// only exits are checkout and renewed `MandatoryCharging` ticks.
    pub fn dispatch_to(&mut self, next: SlotStatus) -> Result<(), SlotStateError> {
        debug_assert!(matches!(
            next,
            SlotStatus::Charging
                | SlotStatus::Discharging
                | SlotStatus::OnSite
                | SlotStatus::MandatoryCharging
        ));
        match self.status {
            SlotStatus::Charging | SlotStatus::Discharging | SlotStatus::OnSite => {
                self.status = next;
                Ok(())
            }
            SlotStatus::MandatoryCharging if next == SlotStatus::MandatoryCharging => Ok(()),
            SlotStatus::Available | SlotStatus::Booked | SlotStatus::MandatoryCharging => {
                Err(SlotStateError::InvalidTransition {
                    slot_id: self.id,
                    status: self.status,
                })
            }
        }
    }

    /// Session end: any non-vacant state -> `Available`, clearing the
    /// occupant, window, deadline, and consent.
    pub fn checkout(&mut self) -> Result<(), SlotStateError> {
        match self.status {
            SlotStatus::Available => Err(SlotStateError::InvalidTransition {
                slot_id: self.id,
                status: self.status,
            }),
            SlotStatus::Booked
            | SlotStatus::Charging
            | SlotStatus::Discharging
            | SlotStatus::OnSite
            | SlotStatus::MandatoryCharging => {
                self.status = SlotStatus::Available;
                self.vehicle_id = None;
                self.soc = None;
                self.booking_start = None;
                self.booking_duration = None;
                self.departure_tick = None;
                self.consent = false;
                Ok(())
            }
        }
    }

    /// Checks the occupant/status pairing and SoC bounds.
    pub fn invariants_ok(&self) -> bool {
        let occupant_consistent = match self.status {
            SlotStatus::Available => self.vehicle_id.is_none() && self.soc.is_none(),
            SlotStatus::Booked => self.vehicle_id.is_some() == self.soc.is_some(),
            SlotStatus::Charging
            | SlotStatus::Discharging
            | SlotStatus::OnSite
            | SlotStatus::MandatoryCharging => self.vehicle_id.is_some() && self.soc.is_some(),
        };
        let soc_in_range = self.soc.is_none_or(|s| (0.0..=1.0).contains(&s));
        let window_ordered = match (self.booking_start, self.departure_tick) {
            (Some(start), Some(dep)) => dep > start,
            _ => true,
        };
        occupant_consistent && soc_in_range && window_ordered
    }

    /// Forces the record back into a consistent shape after an internal
    /// invariant failure: clamps SoC and repairs the occupant pairing.
    /// Returns `true` when anything had to change.
    pub(crate) fn correct(&mut self) -> bool {
        let mut changed = false;
        if let Some(s) = self.soc {
            let clamped = s.clamp(0.0, 1.0);
            if clamped != s || !s.is_finite() {
                self.soc = Some(if s.is_finite() { clamped } else { 0.0 });
                changed = true;
            }
        }
        if self.status == SlotStatus::Available && self.is_occupied() {
            self.vehicle_id = None;
            self.soc = None;
            changed = true;
        }
        changed
    }
}
