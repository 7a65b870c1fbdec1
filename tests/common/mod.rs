//! Shared builders for integration tests.
#![allow(dead_code)]

use v2g_sim::config::ScenarioConfig;
use v2g_sim::facility::{CustomerProfile, Vehicle};
use v2g_sim::sim::booking::BookingRequest;
use v2g_sim::sim::engine::Engine;

/// Baseline facility: real tariff and load curves, six slots, two walk-in,
/// the three default customers registered (CUST-001..003).
pub fn baseline_engine() -> Engine {
    engine_from(ScenarioConfig::baseline())
}

pub fn engine_from(cfg: ScenarioConfig) -> Engine {
    let errors = cfg.validate();
    assert!(errors.is_empty(), "scenario should be valid: {errors:?}");
    cfg.build_engine()
}

/// Registration profile for a one-off test vehicle.
pub fn profile(plate: &str, capacity_kwh: f32, max_power_kw: f32, initial_soc: f32) -> CustomerProfile {
    CustomerProfile {
        name: "Test Driver".into(),
        email: format!("{}@example.com", plate.to_lowercase()),
        vehicle: Vehicle::new(
            "Tesla",
            "Model Y",
            2023,
            plate,
            capacity_kwh,
            max_power_kw,
            initial_soc,
        ),
    }
}

/// Plain reservation request with no explicit departure deadline.
pub fn booking(
    customer_id: &str,
    slot_id: u32,
    start: usize,
    duration: usize,
    grid_support: bool,
) -> BookingRequest {
    BookingRequest {
        customer_id: customer_id.to_string(),
        slot_id,
        start,
        duration,
        grid_support,
        departure_tick: None,
    }
}
