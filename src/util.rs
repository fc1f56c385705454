use std::sync::Once;

static INIT_ONCE: Once = Once::new();

/// Install a global `tracing` subscriber once. `RUST_LOG` wins when set;
/// otherwise `info`, or `debug` when `verbose` is on.
pub fn init_tracing_once(verbose: bool) {
    INIT_ONCE.call_once(|| {
        let fallback = if verbose { "debug" } else { "info" };
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| fallback.to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Load `.env` from the working directory (or a parent) if present.
/// Returns whether a file was found.
pub fn load_dotenv() -> bool {
    dotenv::dotenv().is_ok()
}
