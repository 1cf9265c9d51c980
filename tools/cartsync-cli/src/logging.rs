//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install a compact stderr subscriber.
///
/// `RUST_LOG` wins when set. Otherwise only warnings are shown, plus the
/// purchase analytics target. `--verbose` opens up every `cartsync*`
/// target.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,cartsync=debug")
        } else {
            EnvFilter::new("warn,cartsync::analytics=info")
        }
    });

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
