use std::collections::BTreeMap;

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Process-wide instrumentation. Created once at startup and shared by `Arc`.
///
/// Every collector is registered under the configured namespace, so a
/// namespace of `loan_service` yields `loan_service_http_requests_total`.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub loans_recorded_total: IntCounter,
    pub loans_on_book: IntGauge,
}

impl Metrics {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some(namespace.to_string()), None)?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests served, by route group"),
            &["group", "method", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency in seconds"),
            &["group"],
        )?;
        let loans_recorded_total = IntCounter::new("loans_recorded_total", "Loans recorded since start")?;
        let loans_on_book = IntGauge::new("loans_on_book", "Loans currently held in memory")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(loans_recorded_total.clone()))?;
        registry.register(Box::new(loans_on_book.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            loans_recorded_total,
            loans_on_book,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Request totals summed per route group.
    pub fn requests_by_group(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for family in self.http_requests_total.collect() {
            for metric in family.get_metric() {
                let group = metric
                    .get_label()
                    .iter()
                    .find(|l| l.get_name() == "group")
                    .map(|l| l.get_value().to_string());
                if let Some(group) = group {
                    *totals.entry(group).or_insert(0) += metric.get_counter().get_value() as u64;
                }
            }
        }
        totals
    }
}

pub fn encode_families(families: &[MetricFamily]) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
