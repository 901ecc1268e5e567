use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging for a wxmerge binary.
/// - JSON logs on stderr, stdout stays free for forecast output
/// - RUST_LOG respected; default to "info,wxm_reconcile=debug"
pub fn init(service_name: &str) {
    let default_filter = "info,wxm_reconcile=debug";
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(env_filter))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init();

    tracing::info!(service = %service_name, "Logging initialized");
}
