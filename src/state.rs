use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::loans::LoanBook;
use crate::observability::metrics::Metrics;

/// State shared by every route group. Cloning is cheap; all fields are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub metrics: Arc<Metrics>,
    pub loans: Arc<LoanBook>,
    readiness: Arc<AtomicBool>,
    draining: Arc<AtomicBool>,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, metrics: Arc<Metrics>) -> Self {
        Self {
            config: Arc::new(config),
            metrics,
            loans: Arc::new(LoanBook::default()),
            readiness: Arc::new(AtomicBool::new(false)),
            draining: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.readiness.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.load(Ordering::SeqCst)
    }

    pub fn start_draining(&self) {
        self.draining.store(true, Ordering::SeqCst);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
