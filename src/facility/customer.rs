//! Customer and vehicle records. The engine exclusively owns the canonical
//! copies; collaborators only ever see cloned snapshots.

use serde::{Deserialize, Serialize};

/// An electric vehicle attached to exactly one customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub year: u16,
    /// License plate; doubles as the occupant id shown on slot snapshots.
    pub plate: String,
    /// Battery capacity in kilowatt-hours (> 0).
    pub capacity_kwh: f32,
    /// Maximum charge/discharge power in kilowatts (> 0).
    pub max_power_kw: f32,
    /// State of charge on arrival, as a fraction (0.0 to 1.0).
    pub initial_soc: f32,
}

impl Vehicle {
    /// Creates a vehicle record.
    ///
    /// # Panics
    ///
    /// Panics if capacity or max power is non-positive, or the initial SoC
    /// is outside [0, 1].
    pub fn new(
        make: &str,
        model: &str,
        year: u16,
        plate: &str,
        capacity_kwh: f32,
        max_power_kw: f32,
        initial_soc: f32,
    ) -> Self {
        assert!(capacity_kwh > 0.0, "capacity_kwh must be > 0");
        assert!(max_power_kw > 0.0, "max_power_kw must be > 0");
        assert!(
            (0.0..=1.0).contains(&initial_soc),
            "initial_soc must be in [0, 1]"
        );
        Self {
            make: make.to_string(),
            model: model.to_string(),
            year,
            plate: plate.to_string(),
            capacity_kwh,
            max_power_kw,
            initial_soc,
        }
    }
}

/// Registration data supplied by the (out-of-core) login layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub name: String,
    pub email: String,
    pub vehicle: Vehicle,
}

/// A registered customer with cumulative savings.
///
/// Created on registration, mutated only by the savings accumulator, never
/// destroyed within a run. `total_savings` is monotonically non-decreasing
/// absent an external billing correction.
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub vehicle: Vehicle,
    pub total_savings: f32,
}

impl Customer {
    /// Creates a customer from a registration profile.
    pub fn from_profile(id: String, profile: CustomerProfile) -> Self {
        Self {
            id,
            name: profile.name,
            email: profile.email,
            vehicle: profile.vehicle,
            total_savings: 0.0,
        }
    }

    /// Accumulates a savings delta from one tick of simulation activity.
    /// Simulation deltas are never negative.
    pub(crate) fn add_savings(&mut self, delta: f32) {
        debug_assert!(delta >= 0.0, "simulation savings deltas are >= 0");
        self.total_savings += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> CustomerProfile {
        CustomerProfile {
            name: "Alex Johnson".into(),
            email: "alex.j@example.com".into(),
            vehicle: Vehicle::new("Tesla", "Model Y", 2023, "V2G-ROCKS", 75.0, 22.0, 0.25),
        }
    }

    #[test]
    fn registration_starts_with_zero_savings() {
        let customer = Customer::from_profile("CUST-001".into(), profile());
        assert_eq!(customer.total_savings, 0.0);
        assert_eq!(customer.vehicle.plate, "V2G-ROCKS");
    }

    #[test]
    fn savings_accumulate() {
        let mut customer = Customer::from_profile("CUST-001".into(), profile());
        customer.add_savings(12.5);
        customer.add_savings(0.0);
        customer.add_savings(4.5);
        assert!((customer.total_savings - 17.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic]
    fn vehicle_rejects_zero_capacity() {
        Vehicle::new("Nissan", "Leaf", 2022, "GRID-EV", 0.0, 11.0, 0.3);
    }

    #[test]
    #[should_panic]
    fn vehicle_rejects_out_of_range_soc() {
        Vehicle::new("Nissan", "Leaf", 2022, "GRID-EV", 60.0, 11.0, 1.3);
    }
}
