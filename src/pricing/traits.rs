//! Tariff trait.

use crate::error::{ProtocolErrorKind, RpcError};
use crate::protocol::{PricingRequest, PricingResponse, ServiceKind};

/// A flat per-unit pricing function bound to one request/response variant.
///
/// # Example
///
/// ```ignore
/// pub struct OffPeakFlightTariff;
///
/// impl Tariff for OffPeakFlightTariff {
///     fn kind(&self) -> ServiceKind { ServiceKind::Flight }
///     fn rate(&self) -> f64 { 40.0 }
/// }
/// ```
pub trait Tariff: Send + Sync + 'static {
    /// The service variant this tariff prices.
    fn kind(&self) -> ServiceKind;

    /// Price per unit of quantity.
    fn rate(&self) -> f64;

    /// Price a quantity.
    ///
    /// Negative quantities are not rejected and produce a negative price.
    fn quote(&self, quantity: i32) -> f64 {
        f64::from(quantity) * self.rate()
    }

    /// Price a decoded request.
    ///
    /// A request addressed to another service is a protocol violation.
    fn price(&self, request: &PricingRequest) -> Result<PricingResponse, RpcError> {
        if request.kind() != self.kind() {
            return Err(RpcError::protocol(ProtocolErrorKind::UnexpectedVariant {
                expected: self.kind(),
                actual: request.kind(),
            }));
        }

        Ok(PricingResponse::for_kind(
            self.kind(),
            self.quote(request.quantity()),
        ))
    }
}
