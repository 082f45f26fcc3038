//! Outbound HTTP integrations

pub mod huis;
pub mod osu;

pub use huis::{HuisApiProvider, MembershipRegistry};
pub use osu::{OsuApiProvider, OsuUser, ProfileProvider, Ruleset, UserStatistics};
