//! Simulation engine owning the canonical facility state.
//!
//! The engine exclusively owns the slot, customer, and booking records for
//! the run; collaborators receive cloned snapshots only. Each tick stages
//! every per-slot update first and commits them as one batch, so no
//! component ever reads a partially updated slot.

use thiserror::Error;

use crate::facility::{Customer, CustomerProfile, GridBaseLoad, Slot, SlotStatus};
use crate::sim::analytics::{AdminAnalytics, Analytics};
use crate::sim::booking::{AdmissionError, BookingConfirmation, BookingRequest, BookingWindow};
use crate::sim::clock::Clock;
use crate::sim::dispatch::{self, DispatchDecision, DispatchInput};
use crate::sim::savings;
use crate::sim::types::{Advisory, SavingsDelta, SimConfig, SlotExchange, TickReport};
use crate::tariff::PriceSchedule;

/// Hard failures of the engine protocol. Admission rejections are not
/// engine errors; they carry their own [`AdmissionError`] reasons.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The single-flight tick gate: only the next expected tick is accepted.
    #[error("tick {got} rejected; the engine expects tick {expected} next")]
    OutOfOrderTick { expected: usize, got: usize },
    #[error("slot {slot_id} does not exist in this facility")]
    UnknownSlot { slot_id: u32 },
    #[error("slot {slot_id} is vacant; nothing to check out")]
    SlotVacant { slot_id: u32 },
}

/// A live occupancy linking a slot to the customer whose vehicle sits in it.
#[derive(Debug, Clone)]
struct ActiveSession {
    slot_id: u32,
    customer_id: String,
}

/// One staged per-slot outcome, applied to the slot only at batch commit.
struct StagedUpdate {
    slot_index: usize,
    target: SlotStatus,
    new_soc: f32,
    exchange: SlotExchange,
    customer_id: String,
}

/// The slot scheduling and energy-exchange simulation engine.
pub struct Engine {
    config: SimConfig,
    tariff: PriceSchedule,
    base_load: GridBaseLoad,
    slots: Vec<Slot>,
    customers: Vec<Customer>,
    bookings: Vec<BookingWindow>,
    sessions: Vec<ActiveSession>,
    analytics: Analytics,
    next_tick: usize,
    customer_seq: usize,
}

impl Engine {
    /// Creates an engine for a facility of `slot_count` fixed slots.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulation configuration
    /// * `tariff` - Immutable price schedule for the run
    /// * `base_load` - Upstream grid load curve
    /// * `slot_count` - Number of physical slots (ids 1..=N)
    /// * `walk_in_slots` - Slot ids that are reserve-only (not bookable)
    ///
    /// # Panics
    ///
    /// Panics if `slot_count` is zero or a walk-in id is out of range.
    pub fn new(
        config: SimConfig,
        tariff: PriceSchedule,
        base_load: GridBaseLoad,
        slot_count: usize,
        walk_in_slots: &[u32],
    ) -> Self {
        assert!(slot_count > 0, "facility requires at least one slot");
        for &id in walk_in_slots {
            assert!(
                id >= 1 && id as usize <= slot_count,
                "walk-in slot id {id} out of range 1..={slot_count}"
            );
        }
        let slots = (1..=slot_count as u32)
            .map(|id| Slot::new(id, !walk_in_slots.contains(&id)))
            .collect();
        Self {
            config,
            tariff,
            base_load,
            slots,
            customers: Vec::new(),
            bookings: Vec::new(),
            sessions: Vec::new(),
            analytics: Analytics::new(slot_count),
            next_tick: 0,
            customer_seq: 0,
        }
    }

    /// Read snapshot of every slot, for rendering.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Read snapshot of every registered customer.
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Looks up one customer by id.
    pub fn customer(&self, customer_id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == customer_id)
    }

    /// Confirmed booking windows still in the ledger.
    pub fn bookings(&self) -> &[BookingWindow] {
        &self.bookings
    }

    /// Read-only analytics view for operator dashboards.
    pub fn analytics_snapshot(&self) -> AdminAnalytics {
        self.analytics.snapshot()
    }

    /// Simulation configuration in effect.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Discards every aggregate counter. Slot and customer state persists.
    pub fn reset_analytics(&mut self) {
        self.analytics.reset();
    }

    /// Registers a customer and returns the canonical record.
    ///
    /// Identity dedup (same email twice) is an external collaborator
    /// concern; the engine hands out a fresh id unconditionally.
    pub fn register_customer(&mut self, profile: CustomerProfile) -> Customer {
        self.customer_seq += 1;
        let id = format!("CUST-{:03}", self.customer_seq);
        let customer = Customer::from_profile(id, profile);
        tracing::info!(customer_id = %customer.id, plate = %customer.vehicle.plate, "customer registered");
        self.customers.push(customer.clone());
        customer
    }

    /// Admits or rejects a reservation request.
    ///
    /// Validates the window shape, the slot's bookability, and half-open
    /// overlap against every confirmed window on the slot. On success the
    /// slot is marked `Booked` (when currently vacant) and the window joins
    /// the ledger. Rejections leave all state untouched.
    pub fn request_booking(
        &mut self,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, AdmissionError> {
        request.validate()?;
        if self.customer(&request.customer_id).is_none() {
            return Err(AdmissionError::UnknownCustomer {
                customer_id: request.customer_id.clone(),
            });
        }
        let slot_index = self.slot_index(request.slot_id).ok_or(
            AdmissionError::UnknownSlot {
                slot_id: request.slot_id,
            },
        )?;
        if !self.slots[slot_index].is_bookable {
            return Err(AdmissionError::SlotUnbookable {
                slot_id: request.slot_id,
            });
        }
        let conflict = self
            .bookings
            .iter()
            .filter(|w| w.slot_id == request.slot_id)
            .any(|w| w.overlaps(request.start, request.end()));
        if conflict {
            return Err(AdmissionError::WindowConflict {
                slot_id: request.slot_id,
            });
        }

        // A vacant slot is marked Booked immediately; a slot already booked
        // or occupied keeps its current window fields and the new window
        // waits in the ledger.
        if self.slots[slot_index].status == SlotStatus::Available {
            self.slots[slot_index].book(
                request.start,
                request.duration,
                request.departure_tick,
                request.grid_support,
            )?;
        }

        let window = BookingWindow::confirm(&request);
        tracing::info!(
            customer_id = %window.customer_id,
            slot_id = window.slot_id,
            start = window.start,
            end = window.end(),
            "booking confirmed"
        );
        self.bookings.push(window);
        let end = request.end();
        Ok(BookingConfirmation {
            customer_id: request.customer_id,
            slot_id: request.slot_id,
            start: request.start,
            end,
            departure_tick: request.departure_tick,
        })
    }

    /// Direct occupancy of a reserve-only slot, bypassing the booking
    /// ledger. The slot must be vacant and not bookable.
    pub fn occupy_walk_in(
        &mut self,
        slot_id: u32,
        customer_id: &str,
        grid_support: bool,
        departure_tick: Option<usize>,
    ) -> Result<(), AdmissionError> {
        let Some(customer) = self.customer(customer_id) else {
            return Err(AdmissionError::UnknownCustomer {
                customer_id: customer_id.to_string(),
            });
        };
        let plate = customer.vehicle.plate.clone();
        let soc = customer.vehicle.initial_soc;
        if let Some(dep) = departure_tick {
            if dep <= self.next_tick {
                return Err(AdmissionError::InvalidWindow {
                    reason: "departure must fall after the current tick",
                });
            }
        }
        let slot_index = self
            .slot_index(slot_id)
            .ok_or(AdmissionError::UnknownSlot { slot_id })?;
        self.slots[slot_index].occupy_walk_in(plate, soc, departure_tick, grid_support)?;
        self.sessions.push(ActiveSession {
            slot_id,
            customer_id: customer_id.to_string(),
        });
        tracing::info!(slot_id, customer_id, "walk-in session started");
        Ok(())
    }

    /// Explicit departure: forces the slot back to `Available` regardless
    /// of remaining time, clears the active window, and returns the updated
    /// slot snapshot.
    pub fn checkout(&mut self, slot_id: u32) -> Result<Slot, EngineError> {
        let slot_index = self
            .slot_index(slot_id)
            .ok_or(EngineError::UnknownSlot { slot_id })?;
        if self.slots[slot_index].status == SlotStatus::Available {
            return Err(EngineError::SlotVacant { slot_id });
        }
        let completed_session = self.slots[slot_index].is_occupied();
        // The state machine accepts checkout from every non-vacant state.
        if let Err(err) = self.slots[slot_index].checkout() {
            tracing::warn!(%err, slot_id, "checkout transition corrected");
        }
        self.bookings.retain(|w| !(w.slot_id == slot_id && w.active));
        self.sessions.retain(|s| s.slot_id != slot_id);
        if completed_session {
            self.analytics.record_turnover();
            tracing::info!(slot_id, "session completed");
        }
        Ok(self.slots[slot_index].clone())
    }

    /// Executes one simulation tick and returns the committed report.
    ///
    /// Strict in-tick order: departures, booking activation, one simulator
    /// pass staged per slot, batch commit, savings accumulation, analytics
    /// aggregation. Only the next expected tick index is accepted; anything
    /// else trips the single-flight gate.
    pub fn advance_tick(&mut self, tick: usize) -> Result<TickReport, EngineError> {
        if tick != self.next_tick {
            return Err(EngineError::OutOfOrderTick {
                expected: self.next_tick,
                got: tick,
            });
        }
        let hour = Clock::hour_of(tick);
        let price = self.tariff.price_at(hour);
        let is_peak = self.tariff.is_peak(hour);

        self.process_departures(tick);
        self.activate_due_bookings(tick);

        let (staged, advisories) = self.simulate_slots(tick, price, is_peak);

        // Batch commit: every staged slot update lands before any component
        // reads the slots again.
        let mut exchanges = Vec::with_capacity(staged.len());
        let mut savings_deltas: Vec<SavingsDelta> = Vec::with_capacity(staged.len());
        let mut savings_total = 0.0_f32;
        for update in staged {
            let slot = &mut self.slots[update.slot_index];
            if let Err(err) = slot.dispatch_to(update.target) {
                tracing::warn!(%err, slot_id = slot.id, "dispatch transition corrected");
            }
            slot.soc = Some(update.new_soc);
            if !slot.invariants_ok() {
                tracing::warn!(slot_id = slot.id, "slot invariant corrected after commit");
                slot.correct();
            }

            let delta = savings::savings_delta(
                update.exchange.energy_kwh,
                price,
                self.config.flat_reference_price,
            );
            if let Some(customer) = self
                .customers
                .iter_mut()
                .find(|c| c.id == update.customer_id)
            {
                customer.add_savings(delta);
            }
            savings_total += delta;
            savings_deltas.push(SavingsDelta {
                customer_id: update.customer_id,
                delta,
            });
            exchanges.push(update.exchange);
        }

        let base_load_kw = self.base_load.load_kw(hour);
        let net_export_kw =
            self.analytics
                .record_tick(tick, hour, &exchanges, savings_total, base_load_kw);

        self.next_tick += 1;
        Ok(TickReport {
            tick,
            hour,
            price,
            is_peak,
            slots: exchanges,
            savings: savings_deltas,
            advisories,
            base_load_kw,
            net_export_kw,
            net_load_kw: base_load_kw - net_export_kw,
            analytics: self.analytics.snapshot(),
        })
    }

    /// Runs every remaining configured tick through a [`Clock`] and
    /// collects the reports. Ticks already committed by earlier
    /// [`advance_tick`](Self::advance_tick) calls are skipped.
    pub fn run(&mut self) -> Vec<TickReport> {
        let mut clock = Clock::new(self.config.ticks);
        let mut reports = Vec::with_capacity(self.config.ticks.saturating_sub(self.next_tick));
        while let Some(tick) = clock.tick() {
            if tick < self.next_tick {
                continue;
            }
            match self.advance_tick(tick) {
                Ok(report) => reports.push(report),
                // Unreachable: the clock hands out exactly the expected tick.
                Err(_) => break,
            }
        }
        reports
    }

    fn slot_index(&self, slot_id: u32) -> Option<usize> {
        self.slots.iter().position(|s| s.id == slot_id)
    }

    /// Auto-checkout of sessions that reached their departure deadline with
    /// the minimum SoC in hand. Vehicles still short of the minimum stay
    /// plugged in (mandatory charging keeps running).
    fn process_departures(&mut self, tick: usize) {
        let due: Vec<u32> = self
            .slots
            .iter()
            .filter(|slot| {
                slot.is_occupied()
                    && slot
                        .departure_tick
                        .is_some_and(|dep| tick >= dep)
                    && slot
                        .soc
                        .is_some_and(|soc| soc >= self.config.min_departure_soc)
            })
            .map(|slot| slot.id)
            .collect();
        for slot_id in due {
            tracing::info!(slot_id, tick, "vehicle departed at deadline");
            // Vacant is impossible here; ignore the error path.
            let _ = self.checkout(slot_id);
        }
    }

    /// Activates confirmed windows whose start has arrived, earliest first.
    /// A window whose slot is still occupied (a mandatory-charge overrun)
    /// is deferred to the next tick.
    fn activate_due_bookings(&mut self, tick: usize) {
        let mut due: Vec<usize> = (0..self.bookings.len())
            .filter(|&i| !self.bookings[i].active && self.bookings[i].start <= tick)
            .collect();
        due.sort_by_key(|&i| self.bookings[i].start);

        for booking_index in due {
            let window = self.bookings[booking_index].clone();
            let Some(slot_index) = self.slot_index(window.slot_id) else {
                continue;
            };
            let Some(customer) = self.customer(&window.customer_id) else {
                continue;
            };
            let plate = customer.vehicle.plate.clone();
            let soc = customer.vehicle.initial_soc;

            let slot = &mut self.slots[slot_index];
            // A queued window on a slot that has since gone vacant needs the
            // Booked step first; an occupied slot defers the arrival.
            if slot.status == SlotStatus::Available {
                if let Err(err) = slot.book(
                    window.start,
                    window.duration,
                    window.departure_tick,
                    window.grid_support,
                ) {
                    tracing::warn!(%err, slot_id = window.slot_id, "booking activation skipped");
                    continue;
                }
            }
            if slot.status != SlotStatus::Booked || slot.is_occupied() {
                tracing::warn!(
                    slot_id = window.slot_id,
                    tick,
                    "arrival deferred, slot still occupied"
                );
                continue;
            }
            // The Booked fields may belong to a different queued window;
            // repoint them at the one actually being activated.
            if let Err(err) = slot.retarget_window(
                window.start,
                window.duration,
                window.departure_tick,
                window.grid_support,
            ) {
                tracing::warn!(%err, slot_id = window.slot_id, "booking activation skipped");
                continue;
            }
            match slot.arrive(plate, soc) {
                Ok(()) => {
                    slot.departure_tick = Some(window.effective_departure());
                    self.bookings[booking_index].active = true;
                    self.sessions.push(ActiveSession {
                        slot_id: window.slot_id,
                        customer_id: window.customer_id.clone(),
                    });
                    tracing::info!(
                        slot_id = window.slot_id,
                        customer_id = %window.customer_id,
                        tick,
                        "vehicle arrived for booking"
                    );
                }
                Err(err) => {
                    tracing::warn!(%err, slot_id = window.slot_id, "arrival rejected");
                }
            }
        }
    }

    /// One simulator pass over every occupied slot; returns staged updates
    /// and any stall advisories. Reads slot state, never writes it.
    fn simulate_slots(
        &self,
        tick: usize,
        price: f32,
        is_peak: bool,
    ) -> (Vec<StagedUpdate>, Vec<Advisory>) {
        let mut staged = Vec::new();
        let mut advisories = Vec::new();

        for session in &self.sessions {
            let Some(slot_index) = self.slot_index(session.slot_id) else {
                continue;
            };
            let slot = &self.slots[slot_index];
            let (Some(soc), true) = (slot.soc, slot.is_occupied()) else {
                continue;
            };
            let Some(customer) = self.customer(&session.customer_id) else {
                continue;
            };
            let vehicle = &customer.vehicle;
            let soc_step = dispatch::soc_step(
                vehicle.max_power_kw,
                self.config.tick_hours,
                vehicle.capacity_kwh,
            );
            let remaining = slot.departure_tick.map(|dep| dep.saturating_sub(tick));

            // Departure safety overrides any price-driven decision.
            let mut mandatory = slot.status == SlotStatus::MandatoryCharging;
            if !mandatory {
                if let Some(rem) = remaining {
                    if dispatch::needs_mandatory(
                        soc,
                        rem,
                        soc_step,
                        self.config.min_departure_soc,
                    ) {
                        mandatory = true;
                        let projected = dispatch::reachable_soc(soc, rem, soc_step);
                        if projected < self.config.min_departure_soc {
                            advisories.push(Advisory::SimulationStall {
                                slot_id: slot.id,
                                projected_soc: projected,
                            });
                        }
                        tracing::warn!(
                            slot_id = slot.id,
                            soc,
                            remaining = rem,
                            "forcing mandatory charge to meet departure minimum"
                        );
                    }
                }
            }

            let decision = if mandatory {
                DispatchDecision::Charge
            } else {
                dispatch::decide(
                    &DispatchInput {
                        price,
                        median_price: self.tariff.median_price(),
                        is_peak,
                        soc,
                        consent: slot.consent(),
                        soc_step,
                        remaining_ticks: remaining,
                    },
                    self.config.reserve_floor_soc,
                    self.config.min_departure_soc,
                )
            };

            let target = if mandatory {
                SlotStatus::MandatoryCharging
            } else {
                match decision {
                    DispatchDecision::Charge => SlotStatus::Charging,
                    DispatchDecision::Discharge => SlotStatus::Discharging,
                    DispatchDecision::Hold => SlotStatus::OnSite,
                }
            };

            let (energy_kwh, clipped_kwh) = match decision {
                DispatchDecision::Charge => {
                    let requested = vehicle.max_power_kw * self.config.tick_hours;
                    let headroom = (1.0 - soc) * vehicle.capacity_kwh;
                    let delivered = requested.min(headroom.max(0.0));
                    (delivered, requested - delivered)
                }
                DispatchDecision::Discharge => {
                    let requested = vehicle.max_power_kw * self.config.tick_hours;
                    let available =
                        (soc - self.config.reserve_floor_soc) * vehicle.capacity_kwh;
                    let delivered = requested.min(available.max(0.0));
                    (-delivered, requested - delivered)
                }
                DispatchDecision::Hold => (0.0, 0.0),
            };

            let new_soc = (soc + energy_kwh / vehicle.capacity_kwh).clamp(0.0, 1.0);
            let power_kw = energy_kwh / self.config.tick_hours;
            tracing::debug!(
                slot_id = slot.id,
                tick,
                ?decision,
                energy_kwh,
                new_soc,
                "dispatch decided"
            );

            staged.push(StagedUpdate {
                slot_index,
                target,
                new_soc,
                exchange: SlotExchange {
                    slot_id: slot.id,
                    status: target,
                    soc: new_soc,
                    power_kw,
                    energy_kwh,
                    clipped_kwh,
                    price,
                },
                customer_id: session.customer_id.clone(),
            });
        }

        staged.sort_by_key(|u| u.exchange.slot_id);
        (staged, advisories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::Vehicle;

    fn flat_tariff() -> PriceSchedule {
        PriceSchedule::new(&[10.0; 24], &[])
    }

    fn quiet_grid() -> GridBaseLoad {
        GridBaseLoad::new(&[50.0; 24], 0.0, 42)
    }

    fn engine() -> Engine {
        Engine::new(
            SimConfig::new(24, 42),
            flat_tariff(),
            quiet_grid(),
            6,
            &[5, 6],
        )
    }

    fn register(engine: &mut Engine, plate: &str, soc: f32) -> Customer {
        engine.register_customer(CustomerProfile {
            name: "Test Driver".into(),
            email: format!("{}@example.com", plate.to_lowercase()),
            vehicle: Vehicle::new("Tesla", "Model Y", 2023, plate, 75.0, 22.0, soc),
        })
    }

    #[test]
    fn registration_hands_out_sequential_ids() {
        let mut engine = engine();
        let a = register(&mut engine, "EV-A", 0.5);
        let b = register(&mut engine, "EV-B", 0.5);
        assert_eq!(a.id, "CUST-001");
        assert_eq!(b.id, "CUST-002");
    }

    #[test]
    fn out_of_order_tick_is_rejected() {
        let mut engine = engine();
        let err = engine.advance_tick(3).unwrap_err();
        assert_eq!(
            err,
            EngineError::OutOfOrderTick {
                expected: 0,
                got: 3
            }
        );
        // replaying a committed tick is rejected too
        engine.advance_tick(0).expect("tick 0 should commit");
        assert!(engine.advance_tick(0).is_err());
    }

    #[test]
    fn booking_activates_at_window_start() {
        let mut engine = engine();
        let customer = register(&mut engine, "EV-A", 0.5);
        engine
            .request_booking(BookingRequest {
                customer_id: customer.id.clone(),
                slot_id: 1,
                start: 2,
                duration: 4,
                grid_support: false,
                departure_tick: None,
            })
            .expect("booking should be admitted");
        assert_eq!(engine.slots()[0].status, SlotStatus::Booked);

        engine.advance_tick(0).expect("tick 0");
        assert!(!engine.slots()[0].is_occupied());

        engine.advance_tick(1).expect("tick 1");
        engine.advance_tick(2).expect("tick 2");
        let slot = &engine.slots()[0];
        assert!(slot.is_occupied());
        assert_eq!(slot.vehicle_id.as_deref(), Some("EV-A"));
        // window end doubles as the departure deadline
        assert_eq!(slot.departure_tick, Some(6));
    }

    #[test]
    fn session_departs_at_window_end() {
        let mut engine = engine();
        let customer = register(&mut engine, "EV-A", 0.5);
        engine
            .request_booking(BookingRequest {
                customer_id: customer.id,
                slot_id: 1,
                start: 0,
                duration: 2,
                grid_support: false,
                departure_tick: None,
            })
            .expect("booking should be admitted");

        engine.advance_tick(0).expect("tick 0");
        engine.advance_tick(1).expect("tick 1");
        assert!(engine.slots()[0].is_occupied());

        engine.advance_tick(2).expect("tick 2");
        assert_eq!(engine.slots()[0].status, SlotStatus::Available);
        assert_eq!(engine.analytics_snapshot().vehicle_turnover, 1);
        assert!(engine.bookings().is_empty());
    }

    #[test]
    fn walk_in_requires_reserve_slot() {
        let mut engine = engine();
        let customer = register(&mut engine, "EV-A", 0.5);
        let err = engine
            .occupy_walk_in(1, &customer.id, false, None)
            .unwrap_err();
        assert_eq!(err, AdmissionError::NotWalkIn { slot_id: 1 });

        engine
            .occupy_walk_in(5, &customer.id, true, None)
            .expect("walk-in on reserve slot");
        assert!(engine.slots()[4].is_occupied());
    }

    #[test]
    fn checkout_forces_available_and_counts_turnover() {
        let mut engine = engine();
        let customer = register(&mut engine, "EV-A", 0.5);
        engine
            .occupy_walk_in(6, &customer.id, false, None)
            .expect("walk-in");
        let slot = engine.checkout(6).expect("checkout");
        assert_eq!(slot.status, SlotStatus::Available);
        assert_eq!(engine.analytics_snapshot().vehicle_turnover, 1);

        let err = engine.checkout(6).unwrap_err();
        assert_eq!(err, EngineError::SlotVacant { slot_id: 6 });
        assert_eq!(
            engine.checkout(99).unwrap_err(),
            EngineError::UnknownSlot { slot_id: 99 }
        );
    }

    #[test]
    fn overlapping_windows_are_rejected_without_mutation() {
        let mut engine = engine();
        let a = register(&mut engine, "EV-A", 0.5);
        let b = register(&mut engine, "EV-B", 0.5);
        engine
            .request_booking(BookingRequest {
                customer_id: a.id,
                slot_id: 1,
                start: 2,
                duration: 4,
                grid_support: false,
                departure_tick: None,
            })
            .expect("first booking");

        let err = engine
            .request_booking(BookingRequest {
                customer_id: b.id.clone(),
                slot_id: 1,
                start: 4,
                duration: 2,
                grid_support: false,
                departure_tick: None,
            })
            .unwrap_err();
        assert_eq!(err, AdmissionError::WindowConflict { slot_id: 1 });
        assert_eq!(engine.bookings().len(), 1);

        // touching window is fine (half-open)
        engine
            .request_booking(BookingRequest {
                customer_id: b.id,
                slot_id: 1,
                start: 6,
                duration: 2,
                grid_support: false,
                departure_tick: None,
            })
            .expect("back-to-back booking");
    }

    #[test]
    fn charging_stops_at_full_and_clips_the_remainder() {
        let mut engine = Engine::new(
            SimConfig::new(24, 42),
            PriceSchedule::new(&[1.0; 24], &[]), // always cheap
            quiet_grid(),
            1,
            &[],
        );
        let customer = register(&mut engine, "EV-A", 0.9);
        engine
            .request_booking(BookingRequest {
                customer_id: customer.id,
                slot_id: 1,
                start: 0,
                duration: 10,
                grid_support: false,
                departure_tick: None,
            })
            .expect("booking");

        // 75 kWh at 0.9 leaves 7.5 kWh headroom; 22 kW requested
        let report = engine.advance_tick(0).expect("tick 0");
        let exchange = &report.slots[0];
        assert!((exchange.energy_kwh - 7.5).abs() < 1e-4);
        assert!((exchange.clipped_kwh - 14.5).abs() < 1e-4);
        assert!((exchange.soc - 1.0).abs() < 1e-6);

        // full battery holds from here on
        let report = engine.advance_tick(1).expect("tick 1");
        assert_eq!(report.slots[0].status, SlotStatus::OnSite);
        assert_eq!(report.slots[0].energy_kwh, 0.0);
    }

    #[test]
    fn discharge_clips_at_the_reserve_floor() {
        let mut engine = Engine::new(
            SimConfig::new(24, 42),
            PriceSchedule::new(&[20.0; 24], &(0..24).collect::<Vec<_>>()), // all peak
            quiet_grid(),
            1,
            &[1],
        );
        let customer = register(&mut engine, "EV-A", 0.4);
        engine
            .occupy_walk_in(1, &customer.id, true, None)
            .expect("walk-in");

        // 0.4 SoC with a 0.3 floor leaves 7.5 kWh; request is 22 kWh
        let report = engine.advance_tick(0).expect("tick 0");
        let exchange = &report.slots[0];
        assert!((exchange.energy_kwh + 7.5).abs() < 1e-4);
        assert!((exchange.soc - 0.3).abs() < 1e-5);

        // at the floor: no further discharge
        let report = engine.advance_tick(1).expect("tick 1");
        assert_ne!(report.slots[0].status, SlotStatus::Discharging);
    }

    #[test]
    fn confirmation_reports_the_admitted_window() {
        let mut engine = engine();
        let customer = register(&mut engine, "EV-A", 0.5);
        let confirmation = engine
            .request_booking(BookingRequest {
                customer_id: customer.id.clone(),
                slot_id: 2,
                start: 3,
                duration: 4,
                grid_support: false,
                departure_tick: Some(8),
            })
            .expect("booking should be admitted");
        assert_eq!(confirmation.customer_id, customer.id);
        assert_eq!(confirmation.slot_id, 2);
        assert_eq!(confirmation.start, 3);
        assert_eq!(confirmation.end, 7);
        assert_eq!(confirmation.departure_tick, Some(8));
    }

    /// Two non-overlapping windows admitted out of start order: the earlier
    /// one activates first and must carry its own consent and window
    /// fields, not those recorded when the slot first went `Booked`.
    #[test]
    fn queued_earlier_window_activates_with_its_own_session() {
        let mut engine = Engine::new(
            SimConfig::new(24, 42),
            PriceSchedule::new(&[20.0; 24], &(0..24).collect::<Vec<_>>()), // all peak
            quiet_grid(),
            1,
            &[],
        );
        let a = register(&mut engine, "EV-A", 0.8);
        let b = register(&mut engine, "EV-B", 0.8);
        // admitted first: a later, non-consenting window
        engine
            .request_booking(BookingRequest {
                customer_id: a.id,
                slot_id: 1,
                start: 10,
                duration: 4,
                grid_support: false,
                departure_tick: None,
            })
            .expect("later booking");
        // admitted second: an earlier, consenting window
        engine
            .request_booking(BookingRequest {
                customer_id: b.id,
                slot_id: 1,
                start: 2,
                duration: 4,
                grid_support: true,
                departure_tick: None,
            })
            .expect("earlier booking");

        engine.advance_tick(0).expect("tick 0");
        engine.advance_tick(1).expect("tick 1");

        // the earlier window arrives with its own fields and consent: in an
        // all-peak tariff the consenting session discharges immediately
        let report = engine.advance_tick(2).expect("tick 2");
        assert_eq!(report.slots[0].status, SlotStatus::Discharging);
        let slot = &engine.slots()[0];
        assert_eq!(slot.vehicle_id.as_deref(), Some("EV-B"));
        assert_eq!(slot.booking_start, Some(2));
        assert_eq!(slot.departure_tick, Some(6));
        assert!(slot.invariants_ok());

        // after the early session departs, the later window runs under its
        // own (non-consenting) terms
        for tick in 3..10 {
            engine.advance_tick(tick).expect("gap tick");
        }
        let report = engine.advance_tick(10).expect("tick 10");
        assert_ne!(report.slots[0].status, SlotStatus::Discharging);
        let slot = &engine.slots()[0];
        assert_eq!(slot.vehicle_id.as_deref(), Some("EV-A"));
        assert_eq!(slot.booking_start, Some(10));
        assert!(slot.invariants_ok());
    }

    #[test]
    fn run_resumes_after_manual_ticks() {
        let mut engine = engine();
        engine.advance_tick(0).expect("tick 0");
        engine.advance_tick(1).expect("tick 1");
        let reports = engine.run();
        assert_eq!(reports.len(), 22);
        assert_eq!(reports.first().map(|r| r.tick), Some(2));
        assert_eq!(reports.last().map(|r| r.tick), Some(23));
    }
}
