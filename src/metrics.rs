//! Query metrics and tracing spans.
//!
//! With the `metrics` feature, [`METRICS`] counts statements and errors and
//! records statement latency into a Prometheus registry that callers can
//! scrape through [`MeridianMetrics::render`]. With the `tracing` feature,
//! [`tracing_helpers`] provides the spans the executors enter.

#[cfg(feature = "metrics")]
pub use self::prometheus_metrics::{MeridianMetrics, METRICS};

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider as _};
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<MeridianMetrics> = Lazy::new(MeridianMetrics::init);

    pub struct MeridianMetrics {
        registry: Registry,
        // Keeps the exporter's reader alive for the process lifetime.
        _provider: Option<SdkMeterProvider>,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
    }

    impl MeridianMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let exporter = opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build();

            let (provider, meter) = match exporter {
                Ok(exporter) => {
                    let provider = SdkMeterProvider::builder().with_reader(exporter).build();
                    let meter = provider.meter("meridian");
                    (Some(provider), meter)
                }
                Err(e) => {
                    log::warn!("prometheus exporter unavailable, metrics go to the global meter: {e}");
                    (None, opentelemetry::global::meter("meridian"))
                }
            };

            let queries_total = meter
                .u64_counter("meridian_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_errors_total = meter
                .u64_counter("meridian_query_errors_total")
                .with_description("Statements that returned a driver error")
                .build();

            let query_duration = meter
                .f64_histogram("meridian_query_duration_seconds")
                .with_description("Duration of statements")
                .build();

            Self {
                registry,
                _provider: provider,
                queries_total,
                query_errors_total,
                query_duration,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        /// Prometheus text exposition of everything recorded so far.
        pub fn render(&self) -> String {
            TextEncoder::new()
                .encode_to_string(&self.registry.gather())
                .unwrap_or_default()
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn execute_query_span(sql: &str) -> Span {
        info_span!("meridian.query", db.system = "postgresql", db.statement = %sql)
    }

    pub fn acquire_connection_span() -> Span {
        info_span!("meridian.connect", db.system = "postgresql")
    }

    pub fn begin_transaction_span() -> Span {
        info_span!("meridian.transaction.begin")
    }

    pub fn commit_transaction_span() -> Span {
        info_span!("meridian.transaction.commit")
    }

    pub fn rollback_transaction_span() -> Span {
        info_span!("meridian.transaction.rollback")
    }
}
