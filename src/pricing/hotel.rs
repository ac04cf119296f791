//! Hotel pricing by night count.

use crate::protocol::ServiceKind;

use super::traits::Tariff;

/// Default price per night.
pub const DEFAULT_HOTEL_RATE: f64 = 100.0;

/// Prices a hotel stay as `nights × rate`.
#[derive(Debug, Clone, Copy)]
pub struct HotelTariff {
    rate: f64,
}

impl HotelTariff {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl Default for HotelTariff {
    fn default() -> Self {
        Self::new(DEFAULT_HOTEL_RATE)
    }
}

impl Tariff for HotelTariff {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Hotel
    }

    fn rate(&self) -> f64 {
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PricingRequest, PricingResponse};

    #[test]
    fn test_hotel_price_is_hundred_per_night() {
        let tariff = HotelTariff::default();
        for n in [0, 1, 5, 365] {
            let response = tariff.price(&PricingRequest::Hotel { nights: n }).unwrap();
            assert_eq!(response, PricingResponse::Hotel { price: 100.0 * f64::from(n) });
        }
    }

    #[test]
    fn test_custom_rate() {
        let tariff = HotelTariff::new(80.0);
        assert_eq!(tariff.quote(3), 240.0);
    }
}
