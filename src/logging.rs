use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "transform_tool=info";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter;
/// calling this twice is harmless.
pub fn init() {
    let format = fmt::format().with_target(true).compact();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if let Err(err) = tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .try_init()
    {
        tracing::debug!(%err, "tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        tracing::info!("logging initialised twice");
    }
}
