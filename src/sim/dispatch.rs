//! Per-tick charge/discharge decision policy.
//!
//! Pure functions over slot and tariff values; the engine applies the
//! outcomes to slot state. Decision rule: discharge is dispatched only into
//! tariff peak hours with recorded consent, enough reserve, and enough
//! recovery margin to still meet the departure minimum; charging is
//! dispatched whenever the price sits at or below the day's median and the
//! battery has headroom; otherwise the slot holds.

/// Outcome of the dispatch policy for one occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    Charge,
    Discharge,
    /// No power flow this tick; the slot sits on-site.
    Hold,
}

/// Inputs the policy reads for one slot.
#[derive(Debug, Clone)]
pub struct DispatchInput {
    /// Buy price this hour.
    pub price: f32,
    /// Median of the day's 24 prices; the cheap-band boundary.
    pub median_price: f32,
    /// Whether this hour is in the tariff peak set.
    pub is_peak: bool,
    /// Occupant SoC before this tick.
    pub soc: f32,
    /// Whether the session recorded V2G consent.
    pub consent: bool,
    /// SoC fraction gained by one full-power charging tick
    /// (`max_power_kw * tick_hours / capacity_kwh`).
    pub soc_step: f32,
    /// Ticks remaining until the effective departure deadline, when one is set.
    pub remaining_ticks: Option<usize>,
}

/// SoC gained or lost by one full-power tick.
pub fn soc_step(max_power_kw: f32, tick_hours: f32, capacity_kwh: f32) -> f32 {
    max_power_kw * tick_hours / capacity_kwh
}

/// Best SoC reachable by the deadline if every remaining tick charges at
/// full power. Clamped to 1.0.
pub fn reachable_soc(soc: f32, remaining_ticks: usize, soc_step: f32) -> f32 {
    (soc + remaining_ticks as f32 * soc_step).min(1.0)
}

/// Whether the slot must be forced into mandatory charging now: skipping
/// even this tick's charge would leave the departure minimum unreachable.
pub fn needs_mandatory(
    soc: f32,
    remaining_ticks: usize,
    soc_step: f32,
    min_departure_soc: f32,
) -> bool {
    let needed = min_departure_soc - soc;
    if needed <= 0.0 {
        return false;
    }
    // Charging can be deferred only while the slack ticks alone still cover
    // the shortfall.
    let slack_ticks = remaining_ticks.saturating_sub(1);
    needed > slack_ticks as f32 * soc_step
}

/// Whether a one-tick discharge still leaves enough margin to recover to
/// the departure minimum with the ticks that remain afterwards.
fn discharge_margin_ok(input: &DispatchInput, min_departure_soc: f32) -> bool {
    let soc_after = input.soc - input.soc_step;
    match input.remaining_ticks {
        None => soc_after >= 0.0,
        Some(remaining) => {
            let recovery_ticks = remaining.saturating_sub(1);
            reachable_soc(soc_after.max(0.0), recovery_ticks, input.soc_step)
                >= min_departure_soc
        }
    }
}

/// Decides this tick's power flow for one occupied slot.
///
/// Mandatory-charging detection happens before this policy runs; a slot
/// that reaches here is free to arbitrage.
pub fn decide(
    input: &DispatchInput,
    reserve_floor_soc: f32,
    min_departure_soc: f32,
) -> DispatchDecision {
    if input.is_peak
        && input.consent
        && input.soc > reserve_floor_soc
        && discharge_margin_ok(input, min_departure_soc)
    {
        return DispatchDecision::Discharge;
    }
    if input.price <= input.median_price && input.soc < 1.0 {
        return DispatchDecision::Charge;
    }
    DispatchDecision::Hold
}
