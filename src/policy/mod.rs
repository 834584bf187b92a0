//! Member eligibility and safe-ban policy
//!
//! This module decides whether a guild member should be banned and drives the
//! scans that apply that decision across the whole membership list.

mod decision;
mod directory;
mod error;
mod member;
mod scan;

pub use decision::{Decision, Outcome, SkipReason, enforce, evaluate};
pub use directory::{GuildDirectory, MemberDirectory, effective_permissions};
pub use error::{PurgeError, PurgeResult};
pub use member::{Authority, MemberSnapshot, PolicyConfig};
pub use scan::{ScanOrigin, ScanReport, scan_and_purge};

#[cfg(test)]
pub use directory::MockMemberDirectory;
