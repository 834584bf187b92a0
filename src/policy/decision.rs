//! Ban decisions
//!
//! [`evaluate`] is a pure predicate over a member snapshot. [`enforce`] turns a
//! decision into either a log line (dry run) or a ban request.

use crate::MODERATION_TARGET;
use crate::policy::{Authority, MemberDirectory, MemberSnapshot, PolicyConfig};
use std::fmt;
use tracing::{debug, error, info};

/// Why a member was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No member to evaluate
    MissingMember,
    /// Bot account
    Bot,
    /// Guild owner
    Owner,
    /// Does not hold the target role
    LacksTargetRole,
    /// Holds at least one role besides the target role
    HasOtherRoles,
    /// The actor cannot ban this member
    InsufficientAuthority,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMember => write!(f, "member missing"),
            Self::Bot => write!(f, "bot account"),
            Self::Owner => write!(f, "guild owner"),
            Self::LacksTargetRole => write!(f, "lacks target role"),
            Self::HasOtherRoles => write!(f, "holds other roles"),
            Self::InsufficientAuthority => write!(f, "insufficient authority"),
        }
    }
}

/// Result of evaluating a member against the policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    /// Ban with the given audit log reason
    Ban(String),
}

/// Decide whether `member` should be banned.
///
/// Checks run in order and the first failing one wins:
/// missing member, bot, owner, target role, no other roles, actor authority.
pub fn evaluate(
    member: Option<&MemberSnapshot>,
    config: &PolicyConfig,
    actor: &Authority,
    reason: &str,
) -> Decision {
    let Some(member) = member else {
        return Decision::Skip(SkipReason::MissingMember);
    };
    if member.bot {
        return Decision::Skip(SkipReason::Bot);
    }
    if member.owner {
        return Decision::Skip(SkipReason::Owner);
    }
    if !member.has_role(config.target_role) {
        return Decision::Skip(SkipReason::LacksTargetRole);
    }
    if !member.has_only_role(config.target_role) {
        return Decision::Skip(SkipReason::HasOtherRoles);
    }
    if !actor.can_ban() || !actor.outranks(member) {
        return Decision::Skip(SkipReason::InsufficientAuthority);
    }
    Decision::Ban(reason.to_string())
}

/// What happened when a decision was enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// Dry run: the ban was only logged
    WouldBan,
    Banned,
    /// The platform rejected the ban
    Failed,
}

/// Apply a decision to a member.
///
/// Ban failures are logged and reported as [`Outcome::Failed`]; they never
/// propagate, so a scan keeps going.
pub async fn enforce<D>(
    directory: &D,
    member: &MemberSnapshot,
    decision: &Decision,
    dry_run: bool,
) -> Outcome
where
    D: MemberDirectory + ?Sized,
{
    let reason = match decision {
        Decision::Skip(skip) => {
            debug!(
                target: MODERATION_TARGET,
                user_id = %member.user_id,
                reason = %skip,
                "Member skipped"
            );
            return Outcome::Skipped(*skip);
        }
        Decision::Ban(reason) => reason,
    };

    if dry_run {
        info!(
            target: MODERATION_TARGET,
            user_id = %member.user_id,
            reason = %reason,
            event = "dry_run_ban",
            "[DRY RUN] Would ban {member} for: {reason}"
        );
        return Outcome::WouldBan;
    }

    match directory.ban(member.user_id, reason).await {
        Ok(()) => {
            info!(
                target: MODERATION_TARGET,
                user_id = %member.user_id,
                reason = %reason,
                event = "ban",
                "Banned {member} for: {reason}"
            );
            Outcome::Banned
        }
        Err(e) => {
            error!(
                target: MODERATION_TARGET,
                user_id = %member.user_id,
                error = %e,
                event = "ban_failed",
                "Failed to ban {}: {e}",
                member.tag
            );
            Outcome::Failed
        }
    }
}
