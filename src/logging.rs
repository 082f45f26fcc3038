//! Tracing subscriber setup.
//!
//! The level comes from `LOG_LEVEL` and defaults to INFO.

use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

/// Parse a `LOG_LEVEL` value. `None` means the value was present but invalid.
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    // LevelFilter reads "" as ERROR; an empty variable means unset here
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<LevelFilter>().ok()
}

pub fn init_tracing() {
    let raw = std::env::var(LOG_LEVEL_VAR).ok();
    let level = raw
        .as_deref()
        .map(parse_level)
        .unwrap_or(Some(LevelFilter::INFO));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(level.unwrap_or(LevelFilter::INFO))
        .init();

    if level.is_none() {
        warn!(
            "Invalid {} value {:?}, falling back to INFO",
            LOG_LEVEL_VAR,
            raw.unwrap_or_default()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_known_values() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::WARN));
        assert_eq!(parse_level("error"), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_parse_level_rejects_garbage() {
        assert_eq!(parse_level("loud"), None);
        assert_eq!(parse_level(""), None);
    }
}
