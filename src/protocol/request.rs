//! Request types for the pricing protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two backend pricing services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Flight,
    Hotel,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Flight => "flight",
            ServiceKind::Hotel => "hotel",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pricing request sent from the booking client to one service.
///
/// Quantities are not range-checked: a negative distance or night count is
/// carried as-is and priced as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PricingRequest {
    /// Price a flight leg of the given distance.
    Flight { distance: i32 },
    /// Price a hotel stay of the given number of nights.
    Hotel { nights: i32 },
}

impl PricingRequest {
    /// The service this request is addressed to.
    pub fn kind(&self) -> ServiceKind {
        match self {
            PricingRequest::Flight { .. } => ServiceKind::Flight,
            PricingRequest::Hotel { .. } => ServiceKind::Hotel,
        }
    }

    /// The priced quantity (distance or nights).
    pub fn quantity(&self) -> i32 {
        match *self {
            PricingRequest::Flight { distance } => distance,
            PricingRequest::Hotel { nights } => nights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_string(&PricingRequest::Flight { distance: 50 }).unwrap();
        assert_eq!(json, r#"{"type":"flight","distance":50}"#);

        let parsed: PricingRequest = serde_json::from_str(r#"{"type":"hotel","nights":5}"#).unwrap();
        assert_eq!(parsed, PricingRequest::Hotel { nights: 5 });
        assert_eq!(parsed.kind(), ServiceKind::Hotel);
        assert_eq!(parsed.quantity(), 5);
    }

    #[test]
    fn test_mismatched_fields_rejected() {
        let result: Result<PricingRequest, _> =
            serde_json::from_str(r#"{"type":"flight","nights":5}"#);
        assert!(result.is_err());

        let result: Result<PricingRequest, _> = serde_json::from_str(r#"{"type":"train","km":5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_service_kind_display() {
        assert_eq!(ServiceKind::Flight.to_string(), "flight");
        assert_eq!(ServiceKind::Hotel.to_string(), "hotel");
    }
}
