//! Prometheus metrics for the CSRF token lifecycle.
//!
//! Exposes a standard `/metrics` endpoint that Prometheus can scrape.
//! Each recorder owns its registry, so several app instances (tests) can coexist.

use prometheus::{opts, CounterVec, Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::csrf::Validation;

pub struct CsrfMetrics {
    registry: Registry,
    issued_total: IntCounter,
    validations_total: CounterVec,
    swept_total: IntCounter,
    live_records: IntGauge,
}

impl CsrfMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let issued_total = IntCounter::with_opts(opts!(
            "portal_csrf_tokens_issued_total",
            "Total CSRF tokens issued"
        ))?;
        let validations_total = CounterVec::new(
            opts!(
                "portal_csrf_validations_total",
                "CSRF validations by outcome"
            ),
            &["outcome"],
        )?;
        let swept_total = IntCounter::with_opts(opts!(
            "portal_csrf_swept_total",
            "Expired CSRF records removed by the sweep job"
        ))?;
        let live_records = IntGauge::with_opts(opts!(
            "portal_csrf_live_records",
            "CSRF records currently held in memory"
        ))?;

        registry.register(Box::new(issued_total.clone()))?;
        registry.register(Box::new(validations_total.clone()))?;
        registry.register(Box::new(swept_total.clone()))?;
        registry.register(Box::new(live_records.clone()))?;

        Ok(Self {
            registry,
            issued_total,
            validations_total,
            swept_total,
            live_records,
        })
    }

    pub fn record_issued(&self, live: usize) {
        self.issued_total.inc();
        self.live_records.set(live as i64);
    }

    pub fn record_validation(&self, outcome: Validation, live: usize) {
        self.validations_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.live_records.set(live as i64);
    }

    pub fn record_sweep(&self, removed: usize, live: usize) {
        self.swept_total.inc_by(removed as u64);
        self.live_records.set(live as i64);
    }

    /// Text exposition format for `/metrics`.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::error!("failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
