//! Core simulation types: configuration and per-tick report data.

use std::fmt;

use serde::Serialize;

use crate::facility::SlotStatus;
use crate::sim::analytics::AdminAnalytics;

/// Centralized simulation configuration.
///
/// The engine and dispatch policy reference this struct for timing and
/// threshold parameters, so thresholds are injected rather than ambient.
///
/// # Examples
///
/// ```
/// use v2g_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(24, 42);
/// assert_eq!(cfg.tick_hours, 1.0);
/// assert_eq!(cfg.ticks, 24);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Total number of simulation ticks to run.
    pub ticks: usize,
    /// Duration of one tick in hours. One tick per tariff hour by default.
    pub tick_hours: f32,
    /// Master random seed (base-load noise only; dispatch is deterministic).
    pub seed: u64,
    /// Minimum SoC a vehicle must hold at its departure deadline.
    pub min_departure_soc: f32,
    /// SoC floor below which discharge is never dispatched.
    pub reserve_floor_soc: f32,
    /// Flat-rate reference price used for the savings comparison.
    pub flat_reference_price: f32,
}

impl SimConfig {
    /// Creates a configuration with the default thresholds.
    ///
    /// # Arguments
    ///
    /// * `ticks` - Total simulation ticks (must be > 0)
    /// * `seed` - Master random seed
    ///
    /// # Panics
    ///
    /// Panics if `ticks` is zero.
    pub fn new(ticks: usize, seed: u64) -> Self {
        assert!(ticks > 0, "ticks must be > 0");
        Self {
            ticks,
            tick_hours: 1.0,
            seed,
            min_departure_soc: 0.2,
            reserve_floor_soc: 0.3,
            flat_reference_price: 11.0,
        }
    }
}

/// One slot's energy exchange for one tick.
#[derive(Debug, Clone, Serialize)]
pub struct SlotExchange {
    /// Slot id.
    pub slot_id: u32,
    /// Slot status after the tick committed.
    pub status: SlotStatus,
    /// Occupant SoC after the tick (0.0 to 1.0).
    pub soc: f32,
    /// Dispatched power (kW; positive = charging, negative = discharging).
    pub power_kw: f32,
    /// Deliverable energy this tick (kWh, signed like `power_kw`).
    /// Only this amount counts for billing.
    pub energy_kwh: f32,
    /// Energy clipped off by SoC bounds this tick (kWh, >= 0).
    pub clipped_kwh: f32,
    /// Buy price in effect this tick.
    pub price: f32,
}

/// Per-customer savings earned during one tick.
#[derive(Debug, Clone, Serialize)]
pub struct SavingsDelta {
    pub customer_id: String,
    /// Savings amount (>= 0; simulation activity never reduces savings).
    pub delta: f32,
}

/// Non-fatal condition surfaced in a tick report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Advisory {
    /// Even charging at max power for every remaining tick cannot reach the
    /// minimum departure SoC. Resolved by mandatory charging; never an error.
    SimulationStall {
        slot_id: u32,
        /// Best SoC reachable by the departure deadline.
        projected_soc: f32,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::SimulationStall {
                slot_id,
                projected_soc,
            } => write!(
                f,
                "slot {slot_id}: departure minimum unreachable \
                 (best projected SoC {:.0}%), forcing mandatory charge",
                projected_soc * 100.0
            ),
        }
    }
}

/// Complete committed record of one simulation tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Tick index.
    pub tick: usize,
    /// Hour-of-day (0-23) the tick maps to.
    pub hour: usize,
    /// Buy price in effect.
    pub price: f32,
    /// Whether the hour is in the tariff peak set.
    pub is_peak: bool,
    /// Per-slot exchanges, one entry per occupied slot.
    pub slots: Vec<SlotExchange>,
    /// Per-customer savings deltas earned this tick.
    pub savings: Vec<SavingsDelta>,
    /// Non-fatal advisories raised this tick.
    pub advisories: Vec<Advisory>,
    /// Base grid load this hour (kW).
    pub base_load_kw: f32,
    /// Facility net export this hour (kW; discharge minus charge).
    pub net_export_kw: f32,
    /// Externally reported grid impact: base load minus net export.
    pub net_load_kw: f32,
    /// Analytics snapshot after this tick committed.
    pub analytics: AdminAnalytics,
}

impl TickReport {
    /// Sum of savings earned across all customers this tick.
    pub fn total_savings_delta(&self) -> f32 {
        self.savings.iter().map(|s| s.delta).sum()
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let charge_kw: f32 = self.slots.iter().map(|s| s.power_kw.max(0.0)).sum();
        let discharge_kw: f32 = self.slots.iter().map(|s| (-s.power_kw).max(0.0)).sum();
        write!(
            f,
            "t={:>3} (h={:>2}) | price={:>6.2}{} | active={} charge={:>6.2} kW \
             discharge={:>6.2} kW | base={:>6.2} kW net={:>6.2} kW | saved={:>7.2}{}",
            self.tick,
            self.hour,
            self.price,
            if self.is_peak { " peak" } else { "     " },
            self.slots.len(),
            charge_kw,
            discharge_kw,
            self.base_load_kw,
            self.net_load_kw,
            self.total_savings_delta(),
            if self.advisories.is_empty() {
                ""
            } else {
                " [stall]"
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::analytics::AdminAnalytics;

    #[test]
    fn sim_config_defaults() {
        let cfg = SimConfig::new(24, 42);
        assert_eq!(cfg.ticks, 24);
        assert_eq!(cfg.tick_hours, 1.0);
        assert_eq!(cfg.seed, 42);
        assert!(cfg.min_departure_soc < cfg.reserve_floor_soc);
    }

    #[test]
    #[should_panic]
    fn sim_config_zero_ticks_panics() {
        SimConfig::new(0, 0);
    }

    #[test]
    fn tick_report_display_does_not_panic() {
        let report = TickReport {
            tick: 2,
            hour: 2,
            price: 4.8,
            is_peak: false,
            slots: vec![SlotExchange {
                slot_id: 3,
                status: SlotStatus::Charging,
                soc: 0.54,
                power_kw: 22.0,
                energy_kwh: 22.0,
                clipped_kwh: 0.0,
                price: 4.8,
            }],
            savings: vec![SavingsDelta {
                customer_id: "CUST-001".into(),
                delta: 136.4,
            }],
            advisories: vec![],
            base_load_kw: 40.0,
            net_export_kw: -22.0,
            net_load_kw: 62.0,
            analytics: AdminAnalytics::default(),
        };
        let line = format!("{report}");
        assert!(!line.is_empty());
        assert!((report.total_savings_delta() - 136.4).abs() < 1e-6);
    }

    #[test]
    fn stall_advisory_display_names_the_slot() {
        let advisory = Advisory::SimulationStall {
            slot_id: 4,
            projected_soc: 0.15,
        };
        let text = format!("{advisory}");
        assert!(text.contains("slot 4"));
        assert!(text.contains("15%"));
    }
}
