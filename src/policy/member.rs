//! Member snapshots, actor authority and policy settings

use poise::serenity_prelude::{Permissions, RoleId, UserId};
use std::collections::HashSet;
use std::fmt;

/// Settings that drive the ban policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Role every verified member holds; members without it are scan candidates
    pub required_role: RoleId,
    /// Role that marks an unverified member; only holders of exactly this role are banned
    pub target_role: RoleId,
    /// Members holding any of these roles are never scanned
    pub exempt_roles: HashSet<RoleId>,
    /// Log would-be bans instead of issuing them
    pub dry_run: bool,
}

/// A point-in-time view of a guild member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub user_id: UserId,
    /// Display tag used in log lines
    pub tag: String,
    pub bot: bool,
    /// Whether this member owns the guild
    pub owner: bool,
    /// Assigned roles, excluding `@everyone`
    pub roles: HashSet<RoleId>,
    /// Position of the member's highest role (0 when only `@everyone`)
    pub highest_role_position: u16,
}

impl MemberSnapshot {
    /// Create a snapshot of a regular, roleless member
    pub fn new(user_id: UserId, tag: impl Into<String>) -> Self {
        Self {
            user_id,
            tag: tag.into(),
            bot: false,
            owner: false,
            roles: HashSet::new(),
            highest_role_position: 0,
        }
    }

    /// Add a role held by this member
    #[must_use]
    pub fn with_role(mut self, role: RoleId, position: u16) -> Self {
        self.roles.insert(role);
        self.highest_role_position = self.highest_role_position.max(position);
        self
    }

    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &HashSet<RoleId>) -> bool {
        !self.roles.is_disjoint(roles)
    }

    /// True when the member holds the target role and nothing else
    pub fn has_only_role(&self, role: RoleId) -> bool {
        self.roles.len() == 1 && self.has_role(role)
    }
}

impl fmt::Display for MemberSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tag, self.user_id)
    }
}

/// What the acting identity is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authority {
    pub permissions: Permissions,
    /// Position of the actor's highest role
    pub highest_role_position: u16,
}

impl Authority {
    pub fn new(permissions: Permissions, highest_role_position: u16) -> Self {
        Self {
            permissions,
            highest_role_position,
        }
    }

    pub fn can_ban(&self) -> bool {
        self.permissions.administrator() || self.permissions.ban_members()
    }

    /// Whether this actor can ban `member` given the role hierarchy
    pub fn outranks(&self, member: &MemberSnapshot) -> bool {
        self.highest_role_position > member.highest_role_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_role() {
        let member = MemberSnapshot::new(UserId::new(1), "user#0001").with_role(RoleId::new(20), 1);
        assert!(member.has_only_role(RoleId::new(20)));
        assert!(!member.has_only_role(RoleId::new(21)));

        let member = member.with_role(RoleId::new(21), 3);
        assert!(!member.has_only_role(RoleId::new(20)));
        assert_eq!(member.highest_role_position, 3);
    }

    #[test]
    fn test_exempt_lookup() {
        let member = MemberSnapshot::new(UserId::new(1), "user").with_role(RoleId::new(5), 1);
        let exempt: HashSet<RoleId> = [RoleId::new(5), RoleId::new(6)].into_iter().collect();
        assert!(member.has_any_role(&exempt));
        assert!(!member.has_any_role(&HashSet::new()));
    }

    #[test]
    fn test_authority() {
        let authority = Authority::new(Permissions::BAN_MEMBERS, 5);
        assert!(authority.can_ban());
        assert!(!Authority::new(Permissions::MANAGE_MESSAGES, 5).can_ban());

        let admin = Authority::new(Permissions::ADMINISTRATOR, 5);
        assert!(admin.can_ban());

        let member = MemberSnapshot::new(UserId::new(1), "user").with_role(RoleId::new(5), 5);
        assert!(!authority.outranks(&member));
        assert!(Authority::new(Permissions::BAN_MEMBERS, 6).outranks(&member));
    }

    #[test]
    fn test_display() {
        let member = MemberSnapshot::new(UserId::new(42), "someone");
        assert_eq!(member.to_string(), "someone (42)");
    }
}
