//! V2G charging-facility slot scheduling and energy-exchange simulator.

pub mod config;
pub mod facility;
pub mod io;
/// Simulation engine, admission, dispatch policy, and analytics modules.
pub mod sim;
pub mod tariff;
