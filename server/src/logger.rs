use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise this crate logs at `default_level`
/// and everything else at `info`.
pub fn setup_logger(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "{}={},tower_http=info,info",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                default_level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
