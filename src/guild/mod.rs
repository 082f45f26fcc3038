//! Access to the configured Discord guild

mod gateway;
mod serenity_gateway;

pub use gateway::{GuildGateway, MemberSnapshot};
pub use serenity_gateway::SerenityGateway;

/// Shared guild gateway type
pub type SharedGuildGateway = std::sync::Arc<dyn GuildGateway>;
