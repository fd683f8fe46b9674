//! Tracing subscriber bootstrap

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr subscriber. `RUST_LOG` wins over `default_directive`
/// (e.g. `"zodal=debug"`). Fails if a global subscriber is already set.
pub fn init_logging(default_directive: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let _ = init_logging("zodal=debug");
        let err = init_logging("zodal=debug").unwrap_err();
        assert!(err.to_string().contains("Failed to initialize tracing"));
    }
}
