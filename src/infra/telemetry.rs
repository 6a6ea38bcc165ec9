use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "vitrine_cache_hit_total",
            Unit::Count,
            "Banner resolutions served from the cache."
        );
        describe_counter!(
            "vitrine_cache_miss_total",
            Unit::Count,
            "Banner resolutions that missed the cache, including failed reads."
        );
        describe_counter!(
            "vitrine_cache_write_failure_total",
            Unit::Count,
            "Cache population attempts that failed or timed out."
        );
        describe_counter!(
            "vitrine_store_read_total",
            Unit::Count,
            "Banner resolutions read from the store of record."
        );
        describe_histogram!(
            "vitrine_http_request_ms",
            Unit::Milliseconds,
            "HTTP request latency in milliseconds."
        );
    });
}
