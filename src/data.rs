use std::{
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::config::Config;

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("guild_id", &self.config.guild_id)
            .field("dry_run", &self.config.policy.dry_run)
            .field("scan_on_ready", &self.config.scan_on_ready)
            .field("startup_scan_claimed", &self.startup_scan_claimed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self(Arc::new(DataInner::new(config)))
    }
}

/// Shared state behind [`Data`]
pub struct DataInner {
    // Immutable configuration loaded at startup
    pub config: Config,
    // Set once the startup scan has been started, so reconnects do not rerun it
    startup_scan_claimed: AtomicBool,
}

impl DataInner {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            startup_scan_claimed: AtomicBool::new(false),
        }
    }

    /// Claim the startup scan. Returns true only for the first caller.
    pub fn claim_startup_scan(&self) -> bool {
        !self.startup_scan_claimed.swap(true, Ordering::AcqRel)
    }
}
