pub mod bot_config;

pub use bot_config::{BotConfig, TIER_COUNT};

#[cfg(test)]
pub(crate) use bot_config::test_config;
