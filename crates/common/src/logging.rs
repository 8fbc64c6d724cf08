use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Install the global diagnostics subscriber.
///
/// Diagnostics are written to stderr so they never interleave with
/// the output of wrapped tools that inherit stdout.
pub fn init(config: &Config) {
    let fmt = fmt::format().with_target(false).compact();

    let target_filters = Targets::new().with_default(config.logging.level);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .event_format(fmt)
                .with_writer(std::io::stderr),
        )
        .with(target_filters)
        .init();
}
