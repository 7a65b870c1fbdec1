//! Facility-wide analytics aggregation.
//!
//! All counters are running and append-only: nothing is ever un-counted
//! except by a full [`Analytics::reset`].

use std::fmt;

use serde::Serialize;

use crate::sim::types::SlotExchange;

/// The tick with the most simultaneously occupied slots so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeakUsage {
    pub tick: usize,
    pub slots_used: usize,
}

/// Cumulative exchanged energy for one slot.
#[derive(Debug, Clone, Serialize)]
pub struct SlotUsage {
    pub slot_id: u32,
    /// Total |energy| exchanged through the slot (kWh).
    pub energy_kwh: f32,
}

/// One point of the reported grid-impact curve.
#[derive(Debug, Clone, Serialize)]
pub struct GridLoadPoint {
    pub tick: usize,
    pub hour: usize,
    pub base_load_kw: f32,
    /// `base_load_kw - facility_net_export_kw`; what the grid actually sees.
    pub net_load_kw: f32,
}

/// Read-only reporting view for operators.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminAnalytics {
    /// Total energy discharged back to the grid across all sessions (kWh).
    pub energy_balanced_kwh: f32,
    /// Total savings handed to customers.
    pub total_savings_provided: f32,
    /// Completed sessions (slots returned to Available).
    pub vehicle_turnover: usize,
    pub peak_usage: PeakUsage,
    pub usage_by_slot: Vec<SlotUsage>,
    pub grid_load_history: Vec<GridLoadPoint>,
}

impl fmt::Display for AdminAnalytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Facility Analytics ---")?;
        writeln!(f, "Energy balanced:   {:.2} kWh", self.energy_balanced_kwh)?;
        writeln!(f, "Savings provided:  {:.2}", self.total_savings_provided)?;
        writeln!(f, "Vehicle turnover:  {}", self.vehicle_turnover)?;
        writeln!(
            f,
            "Peak usage:        {} slots at t={}",
            self.peak_usage.slots_used, self.peak_usage.tick
        )?;
        write!(f, "Usage by slot:    ")?;
        for usage in &self.usage_by_slot {
            write!(f, " #{}={:.1}kWh", usage.slot_id, usage.energy_kwh)?;
        }
        Ok(())
    }
}

/// Running aggregator fed once per committed tick.
#[derive(Debug, Clone)]
pub struct Analytics {
    energy_balanced_kwh: f32,
    total_savings_provided: f32,
    vehicle_turnover: usize,
    peak_usage: PeakUsage,
    /// Indexed by slot id - 1 (fixed facility ids 1..=N).
    usage_by_slot: Vec<f32>,
    grid_load_history: Vec<GridLoadPoint>,
}

impl Analytics {
    /// Creates an empty aggregator for a facility of `slot_count` slots.
    pub fn new(slot_count: usize) -> Self {
        Self {
            energy_balanced_kwh: 0.0,
            total_savings_provided: 0.0,
            vehicle_turnover: 0,
            peak_usage: PeakUsage::default(),
            usage_by_slot: vec![0.0; slot_count],
            grid_load_history: Vec::new(),
        }
    }

    /// Folds one committed tick into the running counters and appends the
    /// grid-impact point. Returns the facility net export that hour (kW;
    /// positive when discharging dominates).
    pub fn record_tick(
        &mut self,
        tick: usize,
        hour: usize,
        exchanges: &[SlotExchange],
        savings_total: f32,
        base_load_kw: f32,
    ) -> f32 {
        let mut net_export_kw = 0.0_f32;
        for exchange in exchanges {
            net_export_kw -= exchange.power_kw;
            if exchange.energy_kwh < 0.0 {
                self.energy_balanced_kwh += -exchange.energy_kwh;
            }
            if let Some(slot_energy) =
                self.usage_by_slot.get_mut(exchange.slot_id as usize - 1)
            {
                *slot_energy += exchange.energy_kwh.abs();
            }
        }

        self.total_savings_provided += savings_total;

        let occupied = exchanges.len();
        if occupied > self.peak_usage.slots_used {
            self.peak_usage = PeakUsage {
                tick,
                slots_used: occupied,
            };
        }

        self.grid_load_history.push(GridLoadPoint {
            tick,
            hour,
            base_load_kw,
            net_load_kw: base_load_kw - net_export_kw,
        });

        net_export_kw
    }

    /// Counts a completed session (a slot returning to Available).
    pub fn record_turnover(&mut self) {
        self.vehicle_turnover += 1;
    }

    /// Produces the read-only reporting view.
    pub fn snapshot(&self) -> AdminAnalytics {
        AdminAnalytics {
            energy_balanced_kwh: self.energy_balanced_kwh,
            total_savings_provided: self.total_savings_provided,
            vehicle_turnover: self.vehicle_turnover,
            peak_usage: self.peak_usage,
            usage_by_slot: self
                .usage_by_slot
                .iter()
                .enumerate()
                .map(|(i, &energy_kwh)| SlotUsage {
                    slot_id: i as u32 + 1,
                    energy_kwh,
                })
                .collect(),
            grid_load_history: self.grid_load_history.clone(),
        }
    }

    /// Discards every aggregate. The only way a counter ever goes down.
    pub fn reset(&mut self) {
        let slots = self.usage_by_slot.len();
        *self = Analytics::new(slots);
    }
}
