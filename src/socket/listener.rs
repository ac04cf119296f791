//! TCP listener for a pricing service.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::{LimitsConfig, ServiceConfig};
use crate::error::{ProtocolErrorKind, RpcError};
use crate::pricing::{PricingService, ServiceKind, Tariff};

use super::Connection;

/// Exchange metrics for monitoring.
#[derive(Debug, Default)]
pub struct ExchangeMetrics {
    /// Total exchanges processed.
    pub exchanges_total: AtomicU64,
    /// Total failed exchanges.
    pub exchanges_failed: AtomicU64,
    /// Currently active exchanges.
    pub active_exchanges: AtomicUsize,
}

impl ExchangeMetrics {
    /// Create new exchange metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished exchange.
    pub fn record_exchange(&self, success: bool) {
        self.exchanges_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.exchanges_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total_exchanges(&self) -> u64 {
        self.exchanges_total.load(Ordering::Relaxed)
    }

    pub fn failed_exchanges(&self) -> u64 {
        self.exchanges_failed.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> usize {
        self.active_exchanges.load(Ordering::Relaxed)
    }

    /// Count an exchange as active until the returned guard is dropped.
    pub fn track_active(self: &Arc<Self>) -> ActiveExchange {
        self.active_exchanges.fetch_add(1, Ordering::Relaxed);
        ActiveExchange {
            metrics: Arc::clone(self),
        }
    }
}

/// Holds one slot in `active_exchanges`.
///
/// Released on drop, so a task that panics mid-exchange still leaves the
/// count consistent for `wait_for_drain`.
#[derive(Debug)]
pub struct ActiveExchange {
    metrics: Arc<ExchangeMetrics>,
}

impl Drop for ActiveExchange {
    fn drop(&mut self) {
        self.metrics.active_exchanges.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Accept loop for one pricing service.
///
/// Every accepted connection runs its exchange in its own task; exchanges
/// share nothing but the metrics counters and the concurrency permit pool.
pub struct PricingListener<T: Tariff> {
    listener: TcpListener,
    service: Arc<PricingService<T>>,
    max_exchanges: Option<u64>,
    metrics: Arc<ExchangeMetrics>,
    /// Semaphore for exchange limiting
    exchange_semaphore: Arc<Semaphore>,
}

impl<T: Tariff> PricingListener<T> {
    /// Bind a listener for `tariff` on the configured address.
    pub async fn bind(
        config: &ServiceConfig,
        tariff: T,
        limits: LimitsConfig,
    ) -> Result<Self, RpcError> {
        let listener = TcpListener::bind(&config.bind)
            .await
            .map_err(|e| RpcError::ConnectionFailure {
                address: config.bind.clone(),
                source: e,
            })?;

        let exchange_semaphore = Arc::new(Semaphore::new(limits.max_concurrent_exchanges));
        let service = Arc::new(PricingService::new(tariff, limits));

        info!(
            service = %service.kind(),
            address = %listener.local_addr()?,
            rate = config.rate,
            max_exchanges = ?config.max_exchanges,
            "Pricing listener bound"
        );

        Ok(Self {
            listener,
            service,
            max_exchanges: config.max_exchanges,
            metrics: Arc::new(ExchangeMetrics::new()),
            exchange_semaphore,
        })
    }

    pub fn kind(&self) -> ServiceKind {
        self.service.kind()
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        Ok(self.listener.local_addr()?)
    }

    /// Get exchange metrics.
    pub fn metrics(&self) -> Arc<ExchangeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Serve exactly one exchange inline, without the accept loop.
    pub async fn serve_once(&self) -> Result<(), RpcError> {
        let active = self.metrics.track_active();
        let result = self.service.serve_one(&self.listener).await;
        self.metrics.record_exchange(result.is_ok());
        drop(active);
        result.map(|_| ())
    }

    /// Run the accept loop.
    ///
    /// Stops accepting when `shutdown` is notified or once `max_exchanges`
    /// connections have been accepted; in the latter case it waits for those
    /// exchanges to finish before returning. A failed exchange never stops
    /// the loop.
    pub async fn run(&self, shutdown: Arc<Notify>) -> Result<(), RpcError> {
        info!(service = %self.kind(), "Pricing listener running, waiting for connections...");

        let mut accepted: u64 = 0;

        loop {
            if self.max_exchanges.is_some_and(|max| accepted >= max) {
                info!(
                    service = %self.kind(),
                    accepted = accepted,
                    "Exchange limit reached, no longer accepting"
                );
                self.wait_for_drain().await;
                break;
            }

            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let permit = match self.exchange_semaphore.clone().try_acquire_owned() {
                                Ok(permit) => permit,
                                Err(_) => {
                                    warn!(
                                        service = %self.kind(),
                                        peer = %addr,
                                        "Exchange limit reached, rejecting connection"
                                    );
                                    continue;
                                }
                            };

                            accepted += 1;
                            let service = Arc::clone(&self.service);
                            let metrics = Arc::clone(&self.metrics);

                            let active = metrics.track_active();
                            debug!(
                                service = %service.kind(),
                                peer = %addr,
                                active = metrics.active(),
                                "New connection accepted"
                            );

                            tokio::spawn(async move {
                                let _permit = permit;
                                let _active = active;
                                let result = match Connection::establish(
                                    stream,
                                    addr.to_string(),
                                    service.limits(),
                                ).await {
                                    Ok(conn) => service.handle(conn).await.map(|_| ()),
                                    Err(e) => {
                                        if !matches!(
                                            &e,
                                            RpcError::ProtocolViolation {
                                                kind: ProtocolErrorKind::ConnectionClosed
                                            }
                                        ) {
                                            error!(
                                                service = %service.kind(),
                                                peer = %addr,
                                                error = %e,
                                                "Handshake failed"
                                            );
                                        }
                                        Err(e)
                                    }
                                };

                                metrics.record_exchange(result.is_ok());
                                debug!(
                                    active = metrics.active().saturating_sub(1),
                                    success = result.is_ok(),
                                    "Exchange task finished"
                                );
                            });
                        }
                        Err(e) => {
                            warn!(service = %self.kind(), error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!(service = %self.kind(), "Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Wait for all active exchanges to drain.
    ///
    /// Returns immediately if there are no active exchanges.
    pub async fn wait_for_drain(&self) {
        let poll_interval = std::time::Duration::from_millis(20);

        while self.metrics.active() > 0 {
            debug!(active = self.metrics.active(), "Waiting for exchanges to drain");
            tokio::time::sleep(poll_interval).await;
        }

        debug!(service = %self.kind(), "All exchanges drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counting() {
        let metrics = ExchangeMetrics::new();
        metrics.record_exchange(true);
        metrics.record_exchange(false);
        metrics.record_exchange(true);
        assert_eq!(metrics.total_exchanges(), 3);
        assert_eq!(metrics.failed_exchanges(), 1);
        assert_eq!(metrics.active(), 0);
    }

    #[test]
    fn test_active_guard_releases_on_drop() {
        let metrics = Arc::new(ExchangeMetrics::new());
        let first = metrics.track_active();
        let second = metrics.track_active();
        assert_eq!(metrics.active(), 2);

        drop(first);
        assert_eq!(metrics.active(), 1);
        drop(second);
        assert_eq!(metrics.active(), 0);
    }

    #[tokio::test]
    async fn test_panicking_exchange_task_still_drains() {
        let metrics = Arc::new(ExchangeMetrics::new());
        let active = metrics.track_active();

        let task = tokio::spawn(async move {
            let _active = active;
            let handler_failed = true;
            if handler_failed {
                panic!("exchange task failed");
            }
        });
        assert!(task.await.unwrap_err().is_panic());

        assert_eq!(metrics.active(), 0);
    }
}
