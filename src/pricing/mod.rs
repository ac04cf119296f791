//! Pricing services.
//!
//! One generic [`PricingService`] runs the per-exchange state machine; a
//! [`Tariff`] supplies the pricing function and the request/response variant
//! it accepts.
//!
//! ## Adding a New Tariff
//!
//! 1. Add the request/response variants in `protocol`
//! 2. Create a new file in this directory implementing `Tariff`
//! 3. Add a subcommand for it in `main.rs`

mod flight;
mod hotel;
mod service;
mod traits;

pub use crate::protocol::ServiceKind;
pub use flight::{FlightTariff, DEFAULT_FLIGHT_RATE};
pub use hotel::{HotelTariff, DEFAULT_HOTEL_RATE};
pub use service::{ExchangeState, PricingService};
pub use traits::Tariff;
