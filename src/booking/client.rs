//! Booking client: two independent pricing calls merged into one booking.

use tracing::{debug, error, info};

use crate::config::{ClientConfig, LimitsConfig, Settings};
use crate::error::{ProtocolErrorKind, RpcError};
use crate::protocol::{PricingRequest, PricingResponse, ServiceKind};
use crate::socket::Connection;

use super::model::{Booking, BookingOrder};

/// Client for the flight and hotel pricing services.
#[derive(Debug, Clone)]
pub struct BookingClient {
    flight_addr: String,
    hotel_addr: String,
    limits: LimitsConfig,
}

impl BookingClient {
    pub fn new(config: &ClientConfig, limits: LimitsConfig) -> Self {
        Self {
            flight_addr: config.flight_addr.clone(),
            hotel_addr: config.hotel_addr.clone(),
            limits,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.client, settings.limits.clone())
    }

    /// Price a trip and return the completed booking.
    pub async fn build(
        &self,
        client_id: u64,
        origin: impl Into<String>,
        destination: impl Into<String>,
        distance: i32,
        nights: i32,
    ) -> Result<Booking, RpcError> {
        self.build_order(BookingOrder::new(client_id, origin, destination, distance, nights))
            .await
    }

    /// Price an order.
    ///
    /// The flight and hotel calls run concurrently on separate connections.
    /// If either fails the whole build fails with a `BuildFailure` naming the
    /// step; when both fail the flight failure is reported.
    pub async fn build_order(&self, order: BookingOrder) -> Result<Booking, RpcError> {
        debug!(
            client_id = order.client_id,
            distance = order.distance,
            nights = order.nights,
            "Building booking"
        );

        let (flight, hotel) = tokio::join!(
            self.quote_flight(order.distance),
            self.quote_hotel(order.nights),
        );

        let flight_price = flight.map_err(|e| self.step_failed(&order, ServiceKind::Flight, e))?;
        let hotel_price = hotel.map_err(|e| self.step_failed(&order, ServiceKind::Hotel, e))?;

        let booking = Booking::priced(order, flight_price, hotel_price);
        info!(
            client_id = booking.client_id(),
            flight_price = booking.flight_price(),
            hotel_price = booking.hotel_price(),
            total_price = booking.total_price(),
            "Booking completed"
        );

        Ok(booking)
    }

    /// Price a flight leg with one call to the flight service.
    pub async fn quote_flight(&self, distance: i32) -> Result<f64, RpcError> {
        self.quote(PricingRequest::Flight { distance }).await
    }

    /// Price a hotel stay with one call to the hotel service.
    pub async fn quote_hotel(&self, nights: i32) -> Result<f64, RpcError> {
        self.quote(PricingRequest::Hotel { nights }).await
    }

    fn address(&self, kind: ServiceKind) -> &str {
        match kind {
            ServiceKind::Flight => &self.flight_addr,
            ServiceKind::Hotel => &self.hotel_addr,
        }
    }

    /// One exchange: open, send, receive, close.
    async fn quote(&self, request: PricingRequest) -> Result<f64, RpcError> {
        let expected = request.kind();
        let mut conn = Connection::open(self.address(expected), &self.limits).await?;

        let result: Result<PricingResponse, RpcError> = conn.call(&request).await;
        conn.close().await;
        let response = result?;

        if response.kind() != expected {
            return Err(RpcError::protocol(ProtocolErrorKind::UnexpectedVariant {
                expected,
                actual: response.kind(),
            }));
        }

        debug!(
            service = %expected,
            quantity = request.quantity(),
            price = response.price(),
            "Received quote"
        );
        Ok(response.price())
    }

    fn step_failed(&self, order: &BookingOrder, step: ServiceKind, source: RpcError) -> RpcError {
        error!(
            client_id = order.client_id,
            step = %step,
            address = %self.address(step),
            error = %source,
            "Backend call failed, discarding booking"
        );

        RpcError::BuildFailure {
            step,
            source: Box::new(source),
        }
    }
}
