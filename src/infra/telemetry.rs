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
///
/// Log lines go to stderr so stdout stays free for command output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
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

/// Register descriptions for every metric the client emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "gerber2png_conversion_submitted_total",
            Unit::Count,
            "Total number of conversion uploads started."
        );
        describe_counter!(
            "gerber2png_conversion_succeeded_total",
            Unit::Count,
            "Total number of conversions that produced an image."
        );
        describe_counter!(
            "gerber2png_conversion_failed_total",
            Unit::Count,
            "Total number of conversions that ended in a failure, by kind."
        );
        describe_counter!(
            "gerber2png_conversion_stale_total",
            Unit::Count,
            "Total number of conversion responses discarded after a reset."
        );
        describe_histogram!(
            "gerber2png_conversion_duration_ms",
            Unit::Milliseconds,
            "Time from submit to a settled conversion in milliseconds."
        );
        describe_counter!(
            "gerber2png_catalog_fetch_failed_total",
            Unit::Count,
            "Total number of profile catalog fetches that failed."
        );
    });
}
