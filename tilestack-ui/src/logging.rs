//! Tracing bootstrap for hosts that do not install their own subscriber.

/// Installs a formatted `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise only errors are shown, plus `info`
/// from the tilestack crates. Calling this more than once is harmless.
pub fn init_tracing() {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match tracing_subscriber::EnvFilter::try_new(
            "error,tilestack_ui=info,tilestack_loader=info",
        ) {
            Ok(filter) => filter,
            Err(_) => tracing_subscriber::EnvFilter::new("error"),
        },
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
