//! Booking order and priced booking.

use std::fmt;

use serde::Serialize;

/// The trip to price: who, where, and how much of each service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingOrder {
    pub client_id: u64,
    pub origin: String,
    pub destination: String,
    pub distance: i32,
    pub nights: i32,
}

impl BookingOrder {
    pub fn new(
        client_id: u64,
        origin: impl Into<String>,
        destination: impl Into<String>,
        distance: i32,
        nights: i32,
    ) -> Self {
        Self {
            client_id,
            origin: origin.into(),
            destination: destination.into(),
            distance,
            nights,
        }
    }
}

/// A fully priced booking.
///
/// Only constructed once both backend prices are known, so a value of this
/// type always satisfies `total_price == flight_price + hotel_price`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    client_id: u64,
    origin: String,
    destination: String,
    distance: i32,
    nights: i32,
    flight_price: f64,
    hotel_price: f64,
    total_price: f64,
}

impl Booking {
    pub(crate) fn priced(order: BookingOrder, flight_price: f64, hotel_price: f64) -> Self {
        Self {
            client_id: order.client_id,
            origin: order.origin,
            destination: order.destination,
            distance: order.distance,
            nights: order.nights,
            flight_price,
            hotel_price,
            total_price: flight_price + hotel_price,
        }
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn distance(&self) -> i32 {
        self.distance
    }

    pub fn nights(&self) -> i32 {
        self.nights
    }

    pub fn flight_price(&self) -> f64 {
        self.flight_price
    }

    pub fn hotel_price(&self) -> f64 {
        self.hotel_price
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Booking [client_id={}, origin={}, destination={}, flight_price={:.2}, hotel_price={:.2}, total_price={:.2}]",
            self.client_id,
            self.origin,
            self.destination,
            self.flight_price,
            self.hotel_price,
            self.total_price
        )
    }
}
