//! Membership and permission lookups
//!
//! [`MemberDirectory`] is the seam between the policy and Discord. The
//! serenity-backed [`GuildDirectory`] talks to the REST API directly so scans
//! do not depend on the member cache being populated.

use crate::policy::{Authority, MemberSnapshot, PurgeError, PurgeResult};
use poise::serenity_prelude::{GuildId, Http, Member, PartialGuild, Permissions, RoleId, UserId};
use std::collections::{HashMap, HashSet};

#[cfg(test)]
use mockall::automock;

/// Discord caps a member list page at 1000 entries
const MEMBER_PAGE_SIZE: u64 = 1000;

/// Membership provider and permission oracle for a single guild
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Fetch every member of the guild
    async fn fetch_members(&self) -> PurgeResult<Vec<MemberSnapshot>>;

    /// Authority of the bot itself in the guild
    async fn actor_authority(&self) -> PurgeResult<Authority>;

    /// Ban a member, recording `reason` in the audit log
    async fn ban(&self, user_id: UserId, reason: &str) -> PurgeResult<()>;
}

/// [`MemberDirectory`] backed by the Discord REST API
pub struct GuildDirectory<'a> {
    http: &'a Http,
    guild_id: GuildId,
    bot_id: UserId,
}

impl<'a> GuildDirectory<'a> {
    pub fn new(http: &'a Http, guild_id: GuildId, bot_id: UserId) -> Self {
        Self {
            http,
            guild_id,
            bot_id,
        }
    }

    fn fetch_error(&self, error: impl std::fmt::Display) -> PurgeError {
        PurgeError::MemberFetch {
            guild_id: self.guild_id.get(),
            reason: error.to_string(),
        }
    }

    async fn partial_guild(&self) -> PurgeResult<PartialGuild> {
        self.guild_id
            .to_partial_guild(self.http)
            .await
            .map_err(|e| self.fetch_error(e))
    }
}

#[async_trait::async_trait]
impl MemberDirectory for GuildDirectory<'_> {
    async fn fetch_members(&self) -> PurgeResult<Vec<MemberSnapshot>> {
        let roles = GuildRoles::from_guild(&self.partial_guild().await?);

        let mut snapshots = Vec::new();
        let mut after: Option<UserId> = None;
        loop {
            let page = self
                .guild_id
                .members(self.http, Some(MEMBER_PAGE_SIZE), after)
                .await
                .map_err(|e| self.fetch_error(e))?;

            let full_page = page.len() as u64 == MEMBER_PAGE_SIZE;
            after = page.last().map(|member| member.user.id);
            snapshots.extend(page.iter().map(|member| roles.snapshot_member(member)));

            if !full_page {
                break;
            }
        }

        Ok(snapshots)
    }

    async fn actor_authority(&self) -> PurgeResult<Authority> {
        let roles = GuildRoles::from_guild(&self.partial_guild().await?);
        let me = self
            .guild_id
            .member(self.http, self.bot_id)
            .await
            .map_err(|e| self.fetch_error(e))?;

        Ok(roles.authority_of(&roles.snapshot_member(&me)))
    }

    async fn ban(&self, user_id: UserId, reason: &str) -> PurgeResult<()> {
        self.guild_id
            .ban_with_reason(self.http, user_id, 0, reason)
            .await?;
        Ok(())
    }
}

/// Role hierarchy and ownership of a guild, detached from the serenity models
#[derive(Debug, Clone)]
struct GuildRoles {
    /// The implicit `@everyone` role, which shares the guild's id
    everyone: RoleId,
    owner_id: UserId,
    positions: HashMap<RoleId, u16>,
    permissions: HashMap<RoleId, Permissions>,
}

impl GuildRoles {
    fn from_guild(guild: &PartialGuild) -> Self {
        Self {
            everyone: RoleId::new(guild.id.get()),
            owner_id: guild.owner_id,
            positions: guild.roles.iter().map(|(id, role)| (*id, role.position)).collect(),
            permissions: guild
                .roles
                .iter()
                .map(|(id, role)| (*id, role.permissions))
                .collect(),
        }
    }

    fn snapshot_member(&self, member: &Member) -> MemberSnapshot {
        self.snapshot(member.user.id, member.user.tag(), member.user.bot, &member.roles)
    }

    /// Build a snapshot, dropping `@everyone` and ranking by the highest remaining role
    fn snapshot(
        &self,
        user_id: UserId,
        tag: String,
        bot: bool,
        member_roles: &[RoleId],
    ) -> MemberSnapshot {
        let roles: HashSet<RoleId> = member_roles
            .iter()
            .copied()
            .filter(|role| *role != self.everyone)
            .collect();
        let highest_role_position = roles
            .iter()
            .filter_map(|id| self.positions.get(id))
            .copied()
            .max()
            .unwrap_or(0);

        MemberSnapshot {
            user_id,
            tag,
            bot,
            owner: user_id == self.owner_id,
            roles,
            highest_role_position,
        }
    }

    fn authority_of(&self, member: &MemberSnapshot) -> Authority {
        let everyone = self
            .permissions
            .get(&self.everyone)
            .copied()
            .unwrap_or_else(Permissions::empty);
        let permissions = effective_permissions(
            everyone,
            member
                .roles
                .iter()
                .filter_map(|id| self.permissions.get(id))
                .copied(),
            member.owner,
        );
        Authority::new(permissions, member.highest_role_position)
    }
}

/// Guild-level permissions of a member.
///
/// Owners and administrators implicitly hold every permission.
pub fn effective_permissions(
    everyone: Permissions,
    roles: impl IntoIterator<Item = Permissions>,
    owner: bool,
) -> Permissions {
    if owner {
        return Permissions::all();
    }
    let permissions = roles.into_iter().fold(everyone, |acc, role| acc | role);
    if permissions.administrator() {
        Permissions::all()
    } else {
        permissions
    }
}
