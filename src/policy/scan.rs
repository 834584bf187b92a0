//! Membership scans
//!
//! A scan walks a membership snapshot, drops members that are bots, owners,
//! exempt or already verified, and hands every remaining member to
//! [`evaluate`]. The reported `processed` count is the number of members that
//! reached [`evaluate`], not the number banned.

use crate::MODERATION_TARGET;
use crate::policy::{
    Authority, MemberDirectory, Outcome, PolicyConfig, PurgeResult, enforce, evaluate,
};
use std::fmt;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

/// Which workflow started a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrigin {
    /// `/purgeunverified`
    Command,
    /// Scan on the first gateway ready
    Startup,
}

impl ScanOrigin {
    /// Audit log reason for bans issued by this workflow
    pub fn ban_reason(self) -> &'static str {
        match self {
            Self::Command => "Purged by command: missing required role",
            Self::Startup => "Startup scan: missing required role",
        }
    }
}

impl fmt::Display for ScanOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Startup => write!(f, "startup"),
        }
    }
}

/// Summary of a completed scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanReport {
    /// Members that passed the coarse filter and were evaluated
    pub processed: usize,
    pub banned: usize,
    /// Dry-run bans that were only logged
    pub would_ban: usize,
    pub failed: usize,
    pub dry_run: bool,
}

impl ScanReport {
    fn record(&mut self, outcome: Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Skipped(_) => {}
            Outcome::WouldBan => self.would_ban += 1,
            Outcome::Banned => self.banned += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

/// Scan the whole guild and ban members that only hold the target role.
///
/// # Errors
///
/// Returns an error if the membership list cannot be fetched, or if the bot's
/// own authority cannot be fetched once a candidate is found. Individual ban
/// failures are logged and counted instead.
pub async fn scan_and_purge<D>(
    directory: &D,
    config: &PolicyConfig,
    origin: ScanOrigin,
) -> PurgeResult<ScanReport>
where
    D: MemberDirectory + ?Sized,
{
    let span = info_span!(
        target: MODERATION_TARGET,
        "scan",
        scan_id = %Uuid::new_v4(),
        origin = %origin,
        dry_run = config.dry_run
    );
    run_scan(directory, config, origin).instrument(span).await
}

async fn run_scan<D>(
    directory: &D,
    config: &PolicyConfig,
    origin: ScanOrigin,
) -> PurgeResult<ScanReport>
where
    D: MemberDirectory + ?Sized,
{
    let members = directory.fetch_members().await.inspect_err(|e| {
        error!(target: MODERATION_TARGET, error = %e, "Failed to fetch members");
    })?;

    info!(
        target: MODERATION_TARGET,
        members = members.len(),
        event = "scan_start",
        "Scanning members"
    );

    let reason = origin.ban_reason();
    let mut report = ScanReport {
        dry_run: config.dry_run,
        ..ScanReport::default()
    };
    // Looked up on the first candidate only
    let mut actor: Option<Authority> = None;

    for member in &members {
        if member.bot || member.owner {
            continue;
        }
        if member.has_any_role(&config.exempt_roles) {
            continue;
        }
        if member.has_role(config.required_role) {
            continue;
        }

        let actor = match actor {
            Some(actor) => actor,
            None => {
                let authority = directory.actor_authority().await.inspect_err(|e| {
                    error!(target: MODERATION_TARGET, error = %e, "Failed to fetch bot authority");
                })?;
                *actor.insert(authority)
            }
        };

        let decision = evaluate(Some(member), config, &actor, reason);
        let outcome = enforce(directory, member, &decision, config.dry_run).await;
        report.record(outcome);
    }

    info!(
        target: MODERATION_TARGET,
        processed = report.processed,
        banned = report.banned,
        would_ban = report.would_ban,
        failed = report.failed,
        dry_run = report.dry_run,
        event = "scan_complete",
        "Scan complete. Processed {} members (DRY_RUN={})",
        report.processed,
        report.dry_run
    );

    Ok(report)
}
