//! Tracing initialization.

use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize the tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set; otherwise application debug
/// logs and tower-http request traces are enabled.
pub fn init_telemetry() {
    let console_fmt = tracing_subscriber::fmt::layer().event_format(
        Format::default()
            .compact()
            .with_target(false)
            .without_time(),
    );

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "tunedock_api=debug,tunedock_db=debug,tunedock_storage=debug,tunedock_media=debug,\
             tunedock_worker=debug,tower_http=debug"
                .into()
        }))
        .with(console_fmt)
        .init();
}
