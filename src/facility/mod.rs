//! Facility records: slots, customers, and the upstream grid load.

pub mod customer;
pub mod grid;
pub mod slot;

pub use customer::{Customer, CustomerProfile, Vehicle};
pub use grid::GridBaseLoad;
pub use slot::{Slot, SlotStateError, SlotStatus};
