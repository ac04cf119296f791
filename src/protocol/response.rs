//! Response types for the pricing protocol.

use serde::{Deserialize, Serialize};

use super::request::ServiceKind;

/// A priced quote returned by one service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PricingResponse {
    Flight { price: f64 },
    Hotel { price: f64 },
}

impl PricingResponse {
    /// Build the response variant matching `kind`.
    pub fn for_kind(kind: ServiceKind, price: f64) -> Self {
        match kind {
            ServiceKind::Flight => PricingResponse::Flight { price },
            ServiceKind::Hotel => PricingResponse::Hotel { price },
        }
    }

    /// The service that produced this response.
    pub fn kind(&self) -> ServiceKind {
        match self {
            PricingResponse::Flight { .. } => ServiceKind::Flight,
            PricingResponse::Hotel { .. } => ServiceKind::Hotel,
        }
    }

    pub fn price(&self) -> f64 {
        match *self {
            PricingResponse::Flight { price } | PricingResponse::Hotel { price } => price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_kind() {
        let response = PricingResponse::for_kind(ServiceKind::Hotel, 500.0);
        assert_eq!(response, PricingResponse::Hotel { price: 500.0 });
        assert_eq!(response.kind(), ServiceKind::Hotel);
        assert_eq!(response.price(), 500.0);
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_string(&PricingResponse::Flight { price: 2500.0 }).unwrap();
        assert!(json.contains("\"type\":\"flight\""));
        assert!(json.contains("\"price\":2500.0"));
    }
}
