//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::facility::{CustomerProfile, GridBaseLoad, Vehicle};
use crate::sim::engine::Engine;
use crate::sim::types::SimConfig;
use crate::tariff::{HOURS_PER_DAY, PriceSchedule};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Hourly tariff parameters.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Upstream grid base load parameters.
    #[serde(default)]
    pub grid: GridConfig,
    /// Facility slot layout.
    #[serde(default)]
    pub facility: FacilityConfig,
    /// Customers registered at startup.
    #[serde(default = "default_customers")]
    pub customers: Vec<CustomerSeed>,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of simulation ticks to run (must be > 0).
    pub ticks: usize,
    /// Duration of one tick in hours (must be > 0).
    pub tick_hours: f32,
    /// Master random seed.
    pub seed: u64,
    /// Minimum SoC a vehicle must hold at its departure deadline (0.0-1.0).
    pub min_departure_soc: f32,
    /// SoC floor below which discharge is never dispatched (0.0-1.0).
    pub reserve_floor_soc: f32,
    /// Flat-rate reference price for the savings comparison.
    pub flat_reference_price: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: 24,
            tick_hours: 1.0,
            seed: 42,
            min_departure_soc: 0.2,
            reserve_floor_soc: 0.3,
            flat_reference_price: 11.0,
        }
    }
}

/// Hourly tariff parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Buy price for each hour of the day (exactly 24 entries).
    pub buy_price: Vec<f32>,
    /// Hours (0-23) in which discharge may be dispatched.
    pub peak_hours: Vec<usize>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            buy_price: vec![
                6.4, 6.4, 4.8, 4.8, 6.4, 9.6, 12.0, 14.4, 16.0, 14.4, 12.0, 9.6, 9.6, 12.0,
                14.4, 16.0, 17.6, 20.0, 16.0, 12.0, 9.6, 8.0, 6.4, 6.4,
            ],
            peak_hours: vec![7, 8, 9, 10, 17, 18, 19, 20, 21],
        }
    }
}

/// Upstream grid base load parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Base load for each hour of the day (kW, exactly 24 entries).
    pub base_load_kw: Vec<f32>,
    /// Gaussian measurement noise standard deviation (kW).
    pub noise_std: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            base_load_kw: vec![
                45.0, 42.0, 40.0, 38.0, 40.0, 48.0, 55.0, 65.0, 70.0, 68.0, 65.0, 62.0, 60.0,
                62.0, 65.0, 70.0, 75.0, 80.0, 75.0, 68.0, 60.0, 55.0, 50.0, 47.0,
            ],
            noise_std: 2.0,
        }
    }
}

/// Facility slot layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FacilityConfig {
    /// Number of physical slots, ids 1..=N (must be > 0).
    pub slot_count: usize,
    /// Slot ids held back for walk-in sessions (never bookable).
    pub walk_in_slots: Vec<u32>,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            slot_count: 6,
            walk_in_slots: vec![5, 6],
        }
    }
}

/// One customer registered when the engine is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerSeed {
    pub name: String,
    pub email: String,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub plate: String,
    /// Battery capacity (kWh, must be > 0).
    pub capacity_kwh: f32,
    /// Maximum charge/discharge power (kW, must be > 0).
    pub max_power_kw: f32,
    /// State of charge on arrival (0.0-1.0).
    pub initial_soc: f32,
}

impl CustomerSeed {
    fn profile(&self) -> CustomerProfile {
        CustomerProfile {
            name: self.name.clone(),
            email: self.email.clone(),
            vehicle: Vehicle::new(
                &self.make,
                &self.model,
                self.year,
                &self.plate,
                self.capacity_kwh,
                self.max_power_kw,
                self.initial_soc,
            ),
        }
    }
}

fn default_customers() -> Vec<CustomerSeed> {
    vec![
        CustomerSeed {
            name: "Alex Johnson".into(),
            email: "alex.j@example.com".into(),
            make: "Tesla".into(),
            model: "Model Y".into(),
            year: 2023,
            plate: "V2G-ROCKS".into(),
            capacity_kwh: 75.0,
            max_power_kw: 22.0,
            initial_soc: 0.25,
        },
        CustomerSeed {
            name: "Maria Garcia".into(),
            email: "maria.g@example.com".into(),
            make: "Nissan".into(),
            model: "Leaf".into(),
            year: 2022,
            plate: "GRID-EV".into(),
            capacity_kwh: 60.0,
            max_power_kw: 11.0,
            initial_soc: 0.3,
        },
        CustomerSeed {
            name: "Sam Chen".into(),
            email: "sam.c@example.com".into(),
            make: "Ford".into(),
            model: "Mustang Mach-E".into(),
            year: 2023,
            plate: "CHARGE-IT".into(),
            capacity_kwh: 80.0,
            max_power_kw: 11.0,
            initial_soc: 0.2,
        },
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"tariff.buy_price"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: real-world tariff and load curves,
    /// six slots with two held back for walk-ins.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            tariff: TariffConfig::default(),
            grid: GridConfig::default(),
            facility: FacilityConfig::default(),
            customers: default_customers(),
        }
    }

    /// Returns the flat-tariff preset: every hour priced at the flat-rate
    /// reference with no peak set, so no arbitrage is ever dispatched.
    pub fn flat_tariff() -> Self {
        Self {
            tariff: TariffConfig {
                buy_price: vec![11.0; HOURS_PER_DAY],
                peak_hours: Vec::new(),
            },
            ..Self::baseline()
        }
    }

    /// Returns the evening-peak preset: cheap nights, one severe 17:00-21:00
    /// price spike, the peak set narrowed to that spike.
    pub fn evening_peak() -> Self {
        let mut buy_price = vec![5.0_f32; HOURS_PER_DAY];
        for price in buy_price.iter_mut().take(22).skip(17) {
            *price = 24.0;
        }
        Self {
            tariff: TariffConfig {
                buy_price,
                peak_hours: vec![17, 18, 19, 20, 21],
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "flat_tariff", "evening_peak"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "flat_tariff" => Ok(Self::flat_tariff()),
            "evening_peak" => Ok(Self::evening_peak()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.ticks == 0 {
            errors.push(ConfigError {
                field: "simulation.ticks".into(),
                message: "must be > 0".into(),
            });
        }
        if !(s.tick_hours > 0.0 && s.tick_hours.is_finite()) {
            errors.push(ConfigError {
                field: "simulation.tick_hours".into(),
                message: "must be > 0 and finite".into(),
            });
        }
        if !(0.0..=1.0).contains(&s.min_departure_soc) {
            errors.push(ConfigError {
                field: "simulation.min_departure_soc".into(),
                message: "must be in [0.0, 1.0]".into(),
            });
        }
        if !(0.0..=1.0).contains(&s.reserve_floor_soc) {
            errors.push(ConfigError {
                field: "simulation.reserve_floor_soc".into(),
                message: "must be in [0.0, 1.0]".into(),
            });
        }
        if !(s.flat_reference_price >= 0.0 && s.flat_reference_price.is_finite()) {
            errors.push(ConfigError {
                field: "simulation.flat_reference_price".into(),
                message: "must be >= 0 and finite".into(),
            });
        }

        let t = &self.tariff;
        if t.buy_price.len() != HOURS_PER_DAY {
            errors.push(ConfigError {
                field: "tariff.buy_price".into(),
                message: format!("requires exactly {HOURS_PER_DAY} hourly entries"),
            });
        }
        if t.buy_price.iter().any(|p| !p.is_finite() || *p < 0.0) {
            errors.push(ConfigError {
                field: "tariff.buy_price".into(),
                message: "entries must be finite and >= 0".into(),
            });
        }
        if t.peak_hours.iter().any(|h| *h >= HOURS_PER_DAY) {
            errors.push(ConfigError {
                field: "tariff.peak_hours".into(),
                message: format!("hours must be < {HOURS_PER_DAY}"),
            });
        }

        let g = &self.grid;
        if g.base_load_kw.len() != HOURS_PER_DAY {
            errors.push(ConfigError {
                field: "grid.base_load_kw".into(),
                message: format!("requires exactly {HOURS_PER_DAY} hourly entries"),
            });
        }
        if g.base_load_kw.iter().any(|kw| !kw.is_finite() || *kw < 0.0) {
            errors.push(ConfigError {
                field: "grid.base_load_kw".into(),
                message: "entries must be finite and >= 0".into(),
            });
        }
        if g.noise_std < 0.0 {
            errors.push(ConfigError {
                field: "grid.noise_std".into(),
                message: "must be >= 0".into(),
            });
        }

        let f = &self.facility;
        if f.slot_count == 0 {
            errors.push(ConfigError {
                field: "facility.slot_count".into(),
                message: "must be > 0".into(),
            });
        }
        for &id in &f.walk_in_slots {
            if id == 0 || id as usize > f.slot_count {
                errors.push(ConfigError {
                    field: "facility.walk_in_slots".into(),
                    message: format!("slot id {id} out of range 1..={}", f.slot_count),
                });
            }
        }

        for (i, c) in self.customers.iter().enumerate() {
            if c.capacity_kwh <= 0.0 {
                errors.push(ConfigError {
                    field: format!("customers[{i}].capacity_kwh"),
                    message: "must be > 0".into(),
                });
            }
            if c.max_power_kw <= 0.0 {
                errors.push(ConfigError {
                    field: format!("customers[{i}].max_power_kw"),
                    message: "must be > 0".into(),
                });
            }
            if !(0.0..=1.0).contains(&c.initial_soc) {
                errors.push(ConfigError {
                    field: format!("customers[{i}].initial_soc"),
                    message: "must be in [0.0, 1.0]".into(),
                });
            }
            if c.plate.is_empty() {
                errors.push(ConfigError {
                    field: format!("customers[{i}].plate"),
                    message: "must not be empty".into(),
                });
            }
        }

        errors
    }

    /// Builds an engine from a validated scenario, registering every seed
    /// customer in order (ids `CUST-001`, `CUST-002`, ...).
    ///
    /// # Panics
    ///
    /// Panics on a configuration [`validate`](Self::validate) would have
    /// rejected; validate first.
    pub fn build_engine(&self) -> Engine {
        let sim = SimConfig {
            ticks: self.simulation.ticks,
            tick_hours: self.simulation.tick_hours,
            seed: self.simulation.seed,
            min_departure_soc: self.simulation.min_departure_soc,
            reserve_floor_soc: self.simulation.reserve_floor_soc,
            flat_reference_price: self.simulation.flat_reference_price,
        };
        let tariff = PriceSchedule::new(&self.tariff.buy_price, &self.tariff.peak_hours);
        let grid = GridBaseLoad::new(&self.grid.base_load_kw, self.grid.noise_std, sim.seed);
        let mut engine = Engine::new(
            sim,
            tariff,
            grid,
            self.facility.slot_count,
            &self.facility.walk_in_slots,
        );
        for seed in &self.customers {
            engine.register_customer(seed.profile());
        }
        engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
ticks = 48
seed = 99
flat_reference_price = 12.5

[facility]
slot_count = 4
walk_in_slots = [4]

[[customers]]
name = "Test Driver"
email = "driver@example.com"
make = "Tesla"
model = "Model 3"
year = 2024
plate = "TEST-EV"
capacity_kwh = 60.0
max_power_kw = 11.0
initial_soc = 0.5
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.ticks), Some(48));
        assert_eq!(cfg.as_ref().map(|c| c.facility.slot_count), Some(4));
        assert_eq!(cfg.as_ref().map(|c| c.customers.len()), Some(1));
        // tariff kept default
        assert_eq!(
            cfg.as_ref().map(|c| c.tariff.buy_price.len()),
            Some(HOURS_PER_DAY)
        );
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
ticks = 24
bogus_field = true
"#;
        let result = ScenarioConfig::from_toml_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn validation_catches_short_tariff() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.tariff.buy_price.truncate(12);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "tariff.buy_price"));
    }

    #[test]
    fn validation_catches_out_of_range_peak_hour() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.tariff.peak_hours.push(24);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "tariff.peak_hours"));
    }

    #[test]
    fn validation_catches_walk_in_out_of_range() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.facility.walk_in_slots.push(9);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "facility.walk_in_slots"));
    }

    #[test]
    fn validation_catches_bad_customer_soc() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.customers[0].initial_soc = 1.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "customers[0].initial_soc"));
    }

    #[test]
    fn flat_tariff_disables_arbitrage() {
        let cfg = ScenarioConfig::flat_tariff();
        assert!(cfg.tariff.peak_hours.is_empty());
        assert!(cfg.tariff.buy_price.iter().all(|p| *p == 11.0));
    }

    #[test]
    fn evening_peak_narrows_the_peak_set() {
        let cfg = ScenarioConfig::evening_peak();
        assert_eq!(cfg.tariff.peak_hours, vec![17, 18, 19, 20, 21]);
        assert!(cfg.tariff.buy_price[18] > cfg.tariff.buy_price[3]);
    }

    #[test]
    fn build_engine_registers_seed_customers() {
        let engine = ScenarioConfig::baseline().build_engine();
        assert_eq!(engine.customers().len(), 3);
        assert_eq!(engine.customers()[0].id, "CUST-001");
        assert_eq!(engine.slots().len(), 6);
        assert!(!engine.slots()[4].is_bookable);
        assert!(!engine.slots()[5].is_bookable);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok());
        let cfg = cfg.ok();
        // seed overridden
        assert_eq!(cfg.as_ref().map(|c| c.simulation.seed), Some(99));
        // ticks kept default
        assert_eq!(cfg.as_ref().map(|c| c.simulation.ticks), Some(24));
        // default roster kept
        assert_eq!(cfg.as_ref().map(|c| c.customers.len()), Some(3));
    }
}
