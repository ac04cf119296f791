//! Generic pricing service: one exchange per connection.

use std::fmt;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::error::RpcError;
use crate::protocol::{PricingRequest, PricingResponse, ServiceKind};
use crate::socket::Connection;

use super::traits::Tariff;

/// Lifecycle of one exchange on the server side.
///
/// `Closed` is reached on every path, successful or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    WaitingForConnection,
    AwaitingRequest,
    Processing,
    SendingResponse,
    Closed,
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExchangeState::WaitingForConnection => "waiting_for_connection",
            ExchangeState::AwaitingRequest => "awaiting_request",
            ExchangeState::Processing => "processing",
            ExchangeState::SendingResponse => "sending_response",
            ExchangeState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Serves pricing exchanges for one [`Tariff`].
pub struct PricingService<T: Tariff> {
    tariff: T,
    limits: LimitsConfig,
}

impl<T: Tariff> PricingService<T> {
    pub fn new(tariff: T, limits: LimitsConfig) -> Self {
        Self { tariff, limits }
    }

    pub fn kind(&self) -> ServiceKind {
        self.tariff.kind()
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Wait for one connection on `listener` and serve its exchange.
    pub async fn serve_one(&self, listener: &TcpListener) -> Result<PricingResponse, RpcError> {
        debug!(
            service = %self.kind(),
            state = %ExchangeState::WaitingForConnection,
            "Waiting for connection"
        );

        let conn = Connection::accept(listener, &self.limits).await.map_err(|e| {
            warn!(service = %self.kind(), error = %e, "Failed to establish connection");
            e
        })?;

        self.handle(conn).await
    }

    /// Run one exchange to completion on an established connection.
    ///
    /// The connection is closed before returning, whatever the outcome. On
    /// failure no response is written.
    pub async fn handle(&self, mut conn: Connection) -> Result<PricingResponse, RpcError> {
        let exchange_id = Uuid::new_v4();
        let mut state = ExchangeState::AwaitingRequest;

        let result = self.exchange(&mut conn, &mut state, exchange_id).await;

        let failed_in = state;
        conn.close().await;
        state = ExchangeState::Closed;

        match &result {
            Ok(response) => {
                info!(
                    exchange_id = %exchange_id,
                    service = %self.kind(),
                    peer = %conn.peer(),
                    price = response.price(),
                    state = %state,
                    "Exchange completed"
                );
            }
            Err(e) => {
                warn!(
                    exchange_id = %exchange_id,
                    service = %self.kind(),
                    peer = %conn.peer(),
                    failed_in = %failed_in,
                    error = %e,
                    "Exchange abandoned"
                );
            }
        }

        result
    }

    async fn exchange(
        &self,
        conn: &mut Connection,
        state: &mut ExchangeState,
        exchange_id: Uuid,
    ) -> Result<PricingResponse, RpcError> {
        let request: PricingRequest = conn.recv().await?;
        self.transition(state, ExchangeState::Processing, exchange_id);

        let response = self.tariff.price(&request)?;
        debug!(
            exchange_id = %exchange_id,
            quantity = request.quantity(),
            price = response.price(),
            "Priced request"
        );
        self.transition(state, ExchangeState::SendingResponse, exchange_id);

        conn.send(&response).await?;
        Ok(response)
    }

    fn transition(&self, state: &mut ExchangeState, next: ExchangeState, exchange_id: Uuid) {
        debug!(
            exchange_id = %exchange_id,
            service = %self.kind(),
            from = %state,
            to = %next,
            "Exchange state"
        );
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolErrorKind;
    use crate::pricing::{FlightTariff, HotelTariff};
    use crate::protocol::{handshake, write_message};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    fn test_limits() -> LimitsConfig {
        LimitsConfig {
            io_timeout_ms: 500,
            ..LimitsConfig::default()
        }
    }

    #[tokio::test]
    async fn test_serve_one_prices_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let service = PricingService::new(HotelTariff::default(), test_limits());

        let client = tokio::spawn(async move {
            let mut conn = Connection::open(&addr, &test_limits()).await.unwrap();
            let response: PricingResponse =
                conn.call(&PricingRequest::Hotel { nights: 5 }).await.unwrap();
            conn.close().await;
            response
        });

        let served = service.serve_one(&listener).await.unwrap();
        assert_eq!(served, PricingResponse::Hotel { price: 500.0 });
        assert_eq!(client.await.unwrap(), served);
    }

    #[tokio::test]
    async fn test_malformed_request_gets_no_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = PricingService::new(FlightTariff::default(), test_limits());

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (mut rd, mut wr) = stream.into_split();
            handshake(&mut rd, &mut wr, std::time::Duration::from_secs(1))
                .await
                .unwrap();
            write_message(&mut wr, b"{\"type\":\"flight\",\"distance\":\"far\"}")
                .await
                .unwrap();

            // Server must close without answering.
            let mut rest = Vec::new();
            rd.read_to_end(&mut rest).await.unwrap();
            rest
        });

        let result = service.serve_one(&listener).await;
        assert!(matches!(
            result,
            Err(RpcError::ProtocolViolation {
                kind: ProtocolErrorKind::InvalidMessageFormat { .. }
            })
        ));
        assert!(client.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_variant_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let service = PricingService::new(FlightTariff::default(), test_limits());

        let client = tokio::spawn(async move {
            let mut conn = Connection::open(&addr, &test_limits()).await.unwrap();
            let result: Result<PricingResponse, _> =
                conn.call(&PricingRequest::Hotel { nights: 1 }).await;
            result
        });

        let result = service.serve_one(&listener).await;
        assert!(matches!(
            result,
            Err(RpcError::ProtocolViolation {
                kind: ProtocolErrorKind::UnexpectedVariant { .. }
            })
        ));
        assert!(matches!(
            client.await.unwrap(),
            Err(RpcError::ProtocolViolation {
                kind: ProtocolErrorKind::ConnectionClosed
            })
        ));
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let service = PricingService::new(FlightTariff::default(), test_limits());

        let client = tokio::spawn(async move {
            let mut conn = Connection::open(&addr, &test_limits()).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(1_000)).await;
            conn.close().await;
        });

        let result = service.serve_one(&listener).await;
        assert!(matches!(result, Err(RpcError::Timeout { .. })));
        client.await.unwrap();
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ExchangeState::AwaitingRequest.to_string(), "awaiting_request");
        assert_eq!(ExchangeState::Closed.to_string(), "closed");
    }
}
