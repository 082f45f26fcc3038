//! In-memory collaborators for manager tests

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, RoleId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{BotError, Result};
use crate::guild::{GuildGateway, MemberSnapshot};
use crate::integrations::osu::RulesetStatistics;
use crate::integrations::{MembershipRegistry, OsuUser, ProfileProvider, UserStatistics};
use crate::messages::Announcement;

pub fn profile_with_ranks(
    osu: Option<u64>,
    taiko: Option<u64>,
    catch: Option<u64>,
    mania: Option<u64>,
) -> OsuUser {
    let stats = |rank: Option<u64>| {
        Some(UserStatistics {
            play_count: 100,
            pp: 1000.0,
            global_rank: rank,
            has_rank: rank.is_some(),
        })
    };

    OsuUser {
        id: 7562902,
        username: "mrekk".to_string(),
        playmode: "osu".to_string(),
        avatar_url: "https://a.ppy.sh/7562902".to_string(),
        statistics: RulesetStatistics {
            osu: stats(osu),
            taiko: stats(taiko),
            fruits: stats(catch),
            mania: stats(mania),
        },
    }
}

#[derive(Default)]
struct GatewayState {
    members: HashMap<UserId, MemberSnapshot>,
    failing_roles: HashSet<RoleId>,
    missing_channels: HashSet<ChannelId>,
    fail_nickname: bool,
    fail_posts: bool,
    posts: Vec<(ChannelId, Announcement)>,
    role_grants: usize,
}

#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn with_member(id: u64) -> Self {
        let gateway = Self::default();
        gateway.add_member(id);
        gateway
    }

    pub fn add_member(&self, id: u64) {
        let user_id = UserId::new(id);
        self.state.lock().unwrap().members.insert(
            user_id,
            MemberSnapshot {
                id: user_id,
                username: format!("user{}", id),
                display_name: format!("user{}", id),
                avatar_url: String::new(),
                roles: vec![],
            },
        );
    }

    pub fn fail_role(&self, role_id: RoleId) {
        self.state.lock().unwrap().failing_roles.insert(role_id);
    }

    pub fn remove_channel(&self, channel_id: ChannelId) {
        self.state.lock().unwrap().missing_channels.insert(channel_id);
    }

    /// Make every post fail like a dropped connection
    pub fn fail_posts(&self) {
        self.state.lock().unwrap().fail_posts = true;
    }

    pub fn fail_nickname(&self) {
        self.state.lock().unwrap().fail_nickname = true;
    }

    pub fn roles_of(&self, id: u64) -> Vec<RoleId> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&UserId::new(id))
            .map(|m| m.roles.clone())
            .unwrap_or_default()
    }

    pub fn display_name_of(&self, id: u64) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&UserId::new(id))
            .map(|m| m.display_name.clone())
    }

    /// Successful `add_role` calls, duplicates included
    pub fn role_grants(&self) -> usize {
        self.state.lock().unwrap().role_grants
    }

    pub fn posts(&self) -> Vec<(ChannelId, Announcement)> {
        self.state.lock().unwrap().posts.clone()
    }
}

fn unknown_member(id: UserId) -> BotError {
    BotError::Discord {
        message: format!("Unknown Member {}", id),
    }
}

#[async_trait]
impl GuildGateway for FakeGateway {
    async fn member(&self, discord_id: UserId) -> Result<MemberSnapshot> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(&discord_id)
            .cloned()
            .ok_or_else(|| unknown_member(discord_id))
    }

    async fn add_role(&self, discord_id: UserId, role_id: RoleId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_roles.contains(&role_id) {
            return Err(BotError::Discord {
                message: "Missing Permissions".to_string(),
            });
        }
        let member = state
            .members
            .get_mut(&discord_id)
            .ok_or_else(|| unknown_member(discord_id))?;
        if !member.roles.contains(&role_id) {
            member.roles.push(role_id);
        }
        state.role_grants += 1;
        Ok(())
    }

    async fn remove_role(&self, discord_id: UserId, role_id: RoleId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_roles.contains(&role_id) {
            return Err(BotError::Discord {
                message: "Missing Permissions".to_string(),
            });
        }
        let member = state
            .members
            .get_mut(&discord_id)
            .ok_or_else(|| unknown_member(discord_id))?;
        member.roles.retain(|r| *r != role_id);
        Ok(())
    }

    async fn set_nickname(&self, discord_id: UserId, nickname: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_nickname {
            return Err(BotError::Discord {
                message: "Missing Permissions".to_string(),
            });
        }
        let member = state
            .members
            .get_mut(&discord_id)
            .ok_or_else(|| unknown_member(discord_id))?;
        member.display_name = nickname.to_string();
        Ok(())
    }

    async fn post_announcement(
        &self,
        channel_id: ChannelId,
        announcement: &Announcement,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.missing_channels.contains(&channel_id) {
            return Err(BotError::ChannelNotFound {
                id: channel_id.to_string(),
            });
        }
        if state.fail_posts {
            return Err(BotError::Discord {
                message: "connection reset by peer".to_string(),
            });
        }
        state.posts.push((channel_id, announcement.clone()));
        Ok(())
    }
}

/// Returns a fixed profile, or fails when none is set
#[derive(Default)]
pub struct FakeProfiles {
    profile: Mutex<Option<OsuUser>>,
    calls: AtomicUsize,
}

impl FakeProfiles {
    pub fn returning(profile: OsuUser) -> Self {
        Self {
            profile: Mutex::new(Some(profile)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set(&self, profile: OsuUser) {
        *self.profile.lock().unwrap() = Some(profile);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileProvider for FakeProfiles {
    async fn get_user(&self, _access_token: &str) -> Result<OsuUser> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Suspend once like a real HTTP call so concurrent callers interleave
        tokio::task::yield_now().await;
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BotError::ProfileApi {
                message: "401 Unauthorized".to_string(),
            })
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    members: Mutex<HashMap<UserId, u64>>,
    fail: AtomicBool,
}

impl FakeRegistry {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn members(&self) -> HashMap<UserId, u64> {
        self.members.lock().unwrap().clone()
    }
}

#[async_trait]
impl MembershipRegistry for FakeRegistry {
    async fn add_member(&self, osu_id: u64, discord_id: UserId) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BotError::Registry {
                message: "request timed out".to_string(),
            });
        }
        self.members.lock().unwrap().insert(discord_id, osu_id);
        Ok(())
    }

    async fn remove_member(&self, discord_id: UserId) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BotError::Registry {
                message: "500 Internal Server Error".to_string(),
            });
        }
        self.members.lock().unwrap().remove(&discord_id);
        Ok(())
    }
}
