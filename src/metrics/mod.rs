//! Counters for the normalization engine.
//!
//! Recording is always on; an exporter is only installed when an address is
//! configured, so library users and tests pay nothing beyond a no-op recorder.

pub mod parser;

pub use parser::ParserMetrics;

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

use crate::error::{IngestError, Result};

static INIT: Once = Once::new();

/// Environment variable holding the Prometheus listener address
pub const METRICS_ADDR_ENV: &str = "OSBB_METRICS_ADDR";

/// Install the Prometheus exporter if `OSBB_METRICS_ADDR` is set.
///
/// Idempotent. Must be called from within a tokio runtime.
pub fn init_metrics() -> Result<()> {
    let addr = match std::env::var(METRICS_ADDR_ENV) {
        Ok(addr) => addr,
        Err(_) => return Ok(()),
    };
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| IngestError::Config(format!("Invalid {} '{}': {}", METRICS_ADDR_ENV, addr, e)))?;

    let mut outcome = Ok(());
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => {
                ParserMetrics::describe();
                info!("Prometheus exporter listening at http://{}/metrics", addr);
            }
            Err(e) => {
                warn!("Failed to install Prometheus exporter: {}", e);
                outcome = Err(IngestError::Config(format!("metrics exporter: {}", e)));
            }
        }
    });
    outcome
}
