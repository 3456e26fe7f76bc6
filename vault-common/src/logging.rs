//! Tracing subscriber setup shared by embedding binaries and test harnesses

/// Initialize the global tracing subscriber with env-filter support.
///
/// Defaults to INFO when `RUST_LOG` is not set. Safe to call once per
/// process; subsequent calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}
