//! Prometheus metrics collection for Modelgate
//!
//! Tracks which dispatch strategy served each request, how often no
//! strategy matched, and how long delegated calls took. Metrics are
//! exposed via the `/metrics` endpoint in Prometheus text format.

use crate::dispatch::{Operation, RouteStrategy};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector for Modelgate
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    routes_total: IntCounterVec,
    unresolved_total: IntCounterVec,
    dispatch_duration: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 7 operations × 10 strategies, both closed enums
        let routes_total = IntCounterVec::new(
            Opts::new(
                "modelgate_routes_total",
                "Total number of dispatched requests by operation and routing strategy",
            ),
            &["operation", "strategy"],
        )?;

        let unresolved_total = IntCounterVec::new(
            Opts::new(
                "modelgate_routing_unresolved_total",
                "Total number of requests rejected because no routing rule matched",
            ),
            &["operation"],
        )?;

        let dispatch_duration = HistogramVec::new(
            HistogramOpts::new(
                "modelgate_dispatch_duration_ms",
                "Duration of the delegated downstream call in milliseconds",
            )
            .buckets(vec![
                1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0,
            ]),
            &["strategy"],
        )?;

        registry.register(Box::new(routes_total.clone()))?;
        registry.register(Box::new(unresolved_total.clone()))?;
        registry.register(Box::new(dispatch_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            routes_total,
            unresolved_total,
            dispatch_duration,
        })
    }

    /// Record the strategy chosen for a request
    pub fn record_route(&self, operation: Operation, strategy: RouteStrategy) {
        self.routes_total
            .with_label_values(&[operation.as_str(), strategy.as_str()])
            .inc();
    }

    /// Record a request no rule accepted
    pub fn record_unresolved(&self, operation: Operation) {
        self.unresolved_total
            .with_label_values(&[operation.as_str()])
            .inc();
    }

    /// Record the duration of a delegated call
    ///
    /// # Errors
    ///
    /// Rejects NaN, infinite and negative durations, which would corrupt
    /// histogram percentiles.
    pub fn record_dispatch_duration(
        &self,
        strategy: RouteStrategy,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_ms
            )));
        }

        self.dispatch_duration
            .get_metric_with_label_values(&[strategy.as_str()])?
            .observe(duration_ms);
        Ok(())
    }

    /// Number of requests served by `strategy` for `operation`
    pub fn route_count(&self, operation: Operation, strategy: RouteStrategy) -> u64 {
        self.routes_total
            .with_label_values(&[operation.as_str(), strategy.as_str()])
            .get()
    }

    /// Number of unresolved requests for `operation`
    pub fn unresolved_count(&self, operation: Operation) -> u64 {
        self.unresolved_total
            .with_label_values(&[operation.as_str()])
            .get()
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_families.len(),
                    "Prometheus text encoder failed"
                );
                e
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}
