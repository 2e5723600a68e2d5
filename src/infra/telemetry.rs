use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::products::{METRIC_DELETE_POLL_ATTEMPTS, METRIC_DELETE_POLLS};
use crate::cache::{METRIC_CACHE_ERRORS, METRIC_CACHE_INVALIDATIONS, METRIC_CACHE_LOOKUPS};
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
            METRIC_CACHE_LOOKUPS,
            Unit::Count,
            "Object cache lookups, labelled by outcome (hit|miss)."
        );
        describe_counter!(
            METRIC_CACHE_ERRORS,
            Unit::Count,
            "Cache backend failures that degraded to a miss or no-op."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATIONS,
            Unit::Count,
            "Prefix invalidations issued after mutations."
        );
        describe_counter!(
            METRIC_DELETE_POLLS,
            Unit::Count,
            "Soft deletes, labelled by whether the pooled read observed them."
        );
        describe_histogram!(
            METRIC_DELETE_POLL_ATTEMPTS,
            Unit::Count,
            "Polling attempts spent per soft delete."
        );
    });
}
