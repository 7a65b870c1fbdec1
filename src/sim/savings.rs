//! Savings and billing accumulation.
//!
//! Each tick's signed energy exchange converts into a monetary delta
//! against a flat-rate reference: charging below the reference price and
//! discharging above it both earn savings. Deltas are floored at zero so
//! simulation activity alone never reduces a customer's running total
//! (mandatory charging into a peak hour would otherwise go negative);
//! external billing corrections are out of core.

/// Actual monetary flow for one tick's exchange, signed:
/// positive = debit (charging cost), negative = credit (discharge export).
pub fn actual_cost(energy_kwh: f32, price: f32) -> f32 {
    energy_kwh * price
}

/// Savings earned this tick relative to the flat-rate reference.
///
/// `flat_cost - actual_cost = energy_kwh * (reference - price)`, floored at
/// zero. Only deliverable energy may be passed in; clipped amounts never
/// reach billing.
pub fn savings_delta(energy_kwh: f32, price: f32, flat_reference_price: f32) -> f32 {
    let raw = energy_kwh * (flat_reference_price - price);
    if raw < 0.0 {
        tracing::debug!(
            energy_kwh,
            price,
            flat_reference_price,
            "savings delta floored at zero"
        );
        return 0.0;
    }
    raw
}
