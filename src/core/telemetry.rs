use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// Initializes the subscriber. Without `RUST_LOG` the configured level
/// applies to this crate while the chattier dependencies (the AWS SDK,
/// hyper, sqlx) are held at warn so attempt logs stay readable.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.telemetry().log_level;
        EnvFilter::new(format!(
            "{level},hyper=warn,aws_config=warn,aws_smithy_runtime=warn,sqlx=warn"
        ))
    });

    let builder = fmt().with_env_filter(filter).with_target(false);

    if settings.telemetry().json {
        builder
            .json()
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    } else {
        builder
            .with_span_events(fmt::format::FmtSpan::CLOSE)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    }

    Ok(())
}
