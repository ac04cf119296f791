//! Flight pricing by distance.

use crate::protocol::ServiceKind;

use super::traits::Tariff;

/// Default price per unit of distance.
pub const DEFAULT_FLIGHT_RATE: f64 = 50.0;

/// Prices a flight leg as `distance × rate`.
#[derive(Debug, Clone, Copy)]
pub struct FlightTariff {
    rate: f64,
}

impl FlightTariff {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl Default for FlightTariff {
    fn default() -> Self {
        Self::new(DEFAULT_FLIGHT_RATE)
    }
}

impl Tariff for FlightTariff {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Flight
    }

    fn rate(&self) -> f64 {
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::protocol::{PricingRequest, PricingResponse};

    #[test]
    fn test_flight_price_is_fifty_per_unit() {
        let tariff = FlightTariff::default();
        for d in [0, 1, 7, 50, 1_000, i32::MAX] {
            let response = tariff.price(&PricingRequest::Flight { distance: d }).unwrap();
            assert_eq!(response, PricingResponse::Flight { price: 50.0 * f64::from(d) });
        }
    }

    #[test]
    fn test_negative_distance_priced_negative() {
        let tariff = FlightTariff::default();
        let response = tariff.price(&PricingRequest::Flight { distance: -2 }).unwrap();
        assert_eq!(response.price(), -100.0);
    }

    #[test]
    fn test_hotel_request_rejected() {
        let tariff = FlightTariff::default();
        let result = tariff.price(&PricingRequest::Hotel { nights: 3 });
        assert!(matches!(result, Err(RpcError::ProtocolViolation { .. })));
    }
}
