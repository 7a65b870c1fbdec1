//! Simulation core: clock, admission, dispatch policy, savings, analytics,
//! and the engine that ties them to the facility state.

pub mod analytics;
pub mod booking;
pub mod clock;
pub mod dispatch;
pub mod engine;
pub mod savings;
pub mod types;

pub use analytics::{AdminAnalytics, Analytics};
pub use booking::{AdmissionError, BookingConfirmation, BookingRequest, BookingWindow};
pub use clock::Clock;
pub use dispatch::{DispatchDecision, DispatchInput};
pub use engine::{Engine, EngineError};
pub use types::{Advisory, SavingsDelta, SimConfig, SlotExchange, TickReport};
