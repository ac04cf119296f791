//! TCP transport module.
//!
//! Handles single-exchange connections and the pricing service listener.

mod connection;
mod listener;

pub use connection::Connection;
pub use listener::{ActiveExchange, ExchangeMetrics, PricingListener};
