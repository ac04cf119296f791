//! Booking RPC Library
//!
//! This crate provides a small framed RPC protocol over TCP, two pricing
//! services built on it (flight by distance, hotel by nights), and a
//! composite client that prices both legs of a trip into one booking.

pub mod booking;
pub mod config;
pub mod error;
pub mod pricing;
pub mod protocol;
pub mod socket;
