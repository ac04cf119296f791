//! Composite booking client.
//!
//! Prices a trip by calling the flight and hotel services and merges both
//! quotes into a [`Booking`].

mod client;
mod model;

pub use client::BookingClient;
pub use model::{Booking, BookingOrder};
