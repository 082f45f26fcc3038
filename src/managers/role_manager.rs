use poise::serenity_prelude::{RoleId, UserId};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::{BotConfig, TIER_COUNT};
use crate::error::BotError;
use crate::guild::SharedGuildGateway;
use crate::integrations::{OsuUser, Ruleset};

/// Upper rank bounds (exclusive) for tiers 0..=3; everything else is tier 4
const TIER_BOUNDS: [u64; TIER_COUNT - 1] = [10, 100, 1_000, 10_000];

/// Pick the tier role for a global rank.
///
/// Unranked players arrive here as rank 0 and land in the top tier.
pub fn resolve_tier(global_rank: u64, tiers: &[RoleId; TIER_COUNT]) -> RoleId {
    let index = TIER_BOUNDS
        .iter()
        .position(|bound| global_rank < *bound)
        .unwrap_or(TIER_COUNT - 1);
    tiers[index]
}

/// Outcome of granting the verification roles
#[derive(Debug, Default)]
pub struct RoleAssignment {
    /// Roles the API accepted, in grant order
    pub granted: Vec<RoleId>,
    /// Set when a grant failed and the remaining roles were skipped
    pub failure: Option<BotError>,
}

impl RoleAssignment {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Roles to list in the announcement; none after a partial failure.
    /// Roles granted before the failure stay on the member.
    pub fn announced_roles(&self) -> &[RoleId] {
        if self.is_complete() {
            &self.granted
        } else {
            &[]
        }
    }
}

/// Grants the verified and rank-tier roles
pub struct RoleManager {
    gateway: SharedGuildGateway,
    config: Arc<BotConfig>,
}

impl RoleManager {
    pub fn new(gateway: SharedGuildGateway, config: Arc<BotConfig>) -> Self {
        Self { gateway, config }
    }

    pub fn tier_roles(&self, ruleset: Ruleset) -> [RoleId; TIER_COUNT] {
        let roles = &self.config.roles;
        match ruleset {
            Ruleset::Osu => roles.osu_tiers(),
            Ruleset::Taiko => roles.taiko_tiers(),
            Ruleset::Catch => roles.catch_tiers(),
            Ruleset::Mania => roles.mania_tiers(),
        }
    }

    /// Roles a profile qualifies for: verified first, then one tier per ruleset
    pub fn roles_for(&self, profile: &OsuUser) -> Vec<RoleId> {
        let mut roles = vec![self.config.verified_role()];
        for ruleset in Ruleset::ALL {
            let rank = profile.statistics_for(ruleset).rank_or_zero();
            roles.push(resolve_tier(rank, &self.tier_roles(ruleset)));
        }
        roles
    }

    /// Grant roles one by one, stopping at the first failure
    pub async fn grant_verification_roles(
        &self,
        discord_id: UserId,
        profile: &OsuUser,
    ) -> RoleAssignment {
        let mut assignment = RoleAssignment::default();

        for role_id in self.roles_for(profile) {
            if let Err(e) = self.gateway.add_role(discord_id, role_id).await {
                error!(
                    "Failed to add role {} to user {} (osu id: {}): {}",
                    role_id, discord_id, profile.id, e
                );
                assignment.failure = Some(e);
                return assignment;
            }
            assignment.granted.push(role_id);
        }

        info!(
            "Added {} roles to user {} (osu id: {})",
            assignment.granted.len(),
            discord_id,
            profile.id
        );
        assignment
    }
}

/// Shared role manager type
pub type SharedRoleManager = Arc<RoleManager>;

pub fn create_shared_role_manager(
    gateway: SharedGuildGateway,
    config: Arc<BotConfig>,
) -> SharedRoleManager {
    Arc::new(RoleManager::new(gateway, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::managers::test_support::{profile_with_ranks, FakeGateway};

    fn tiers() -> [RoleId; TIER_COUNT] {
        [1, 2, 3, 4, 5].map(RoleId::new)
    }

    #[test]
    fn test_resolve_tier_boundaries() {
        let cases = [
            (0, 1),
            (9, 1),
            (10, 2),
            (99, 2),
            (100, 3),
            (999, 3),
            (1_000, 4),
            (9_999, 4),
            (10_000, 5),
            (u64::MAX, 5),
        ];
        for (rank, expected) in cases {
            assert_eq!(
                resolve_tier(rank, &tiers()),
                RoleId::new(expected),
                "rank {}",
                rank
            );
        }
    }

    #[test]
    fn test_unranked_profile_reads_as_top_tier() {
        let gateway = Arc::new(FakeGateway::default());
        let manager = RoleManager::new(gateway, Arc::new(test_config()));
        let profile = profile_with_ranks(None, None, None, None);

        let roles = manager.roles_for(&profile);
        assert_eq!(roles, [100, 200, 300, 400, 500].map(RoleId::new).to_vec());
    }

    #[tokio::test]
    async fn test_grant_all_roles() {
        let gateway = Arc::new(FakeGateway::with_member(42));
        let manager = RoleManager::new(gateway.clone(), Arc::new(test_config()));
        let profile = profile_with_ranks(Some(5), Some(5000), Some(50), Some(123_456));

        let assignment = manager
            .grant_verification_roles(UserId::new(42), &profile)
            .await;

        let expected = [100, 200, 303, 401, 504].map(RoleId::new).to_vec();
        assert!(assignment.is_complete());
        assert_eq!(assignment.announced_roles(), expected.as_slice());
        assert_eq!(gateway.roles_of(42), expected);
    }

    #[tokio::test]
    async fn test_partial_failure_reports_no_roles() {
        let gateway = Arc::new(FakeGateway::with_member(42));
        gateway.fail_role(RoleId::new(303));
        let manager = RoleManager::new(gateway.clone(), Arc::new(test_config()));
        let profile = profile_with_ranks(Some(5), Some(5000), Some(50), Some(123_456));

        let assignment = manager
            .grant_verification_roles(UserId::new(42), &profile)
            .await;

        assert!(!assignment.is_complete());
        assert_eq!(assignment.granted, [100, 200].map(RoleId::new).to_vec());
        assert!(assignment.announced_roles().is_empty());
        // Grants before the failure are not rolled back
        assert_eq!(gateway.roles_of(42), [100, 200].map(RoleId::new).to_vec());
    }
}
