use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filters longer than this are ignored rather than parsed.
const MAX_FILTER_LEN: usize = 4096;

/// Installs the stderr subscriber.
///
/// Logging is opt-in: the filter comes from `TODOCAL_LOG`, then `RUST_LOG`,
/// and defaults to `off` so the TUI and table output stay clean. Invalid
/// filters are ignored.
pub fn init() {
    let filter = ["TODOCAL_LOG", "RUST_LOG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|raw| parse_filter(&raw))
        .unwrap_or_else(|| EnvFilter::new("off"));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn parse_filter(raw: &str) -> Option<EnvFilter> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_FILTER_LEN {
        return None;
    }
    EnvFilter::try_new(raw).ok()
}
