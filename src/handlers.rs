use crate::policy::{GuildDirectory, ScanOrigin, scan_and_purge};
use crate::{Data, EVENT_TARGET};
use poise::serenity_prelude::{self as serenity, Context, EventHandler, GuildId, Ready};
use tracing::{error, info, warn};

pub struct Handler {
    pub data: Data,
}

impl Handler {
    pub fn new(data: Data) -> Self {
        Self { data }
    }

    /// Run the startup scan, at most once per process
    async fn startup_scan(&self, ctx: &Context, ready: &Ready) {
        let config = &self.data.config;
        if !config.scan_on_ready || !self.data.claim_startup_scan() {
            return;
        }

        info!(target: EVENT_TARGET, "Running startup scan for unverified members...");
        let directory = GuildDirectory::new(&ctx.http, config.guild_id, ready.user.id);
        match scan_and_purge(&directory, &config.policy, ScanOrigin::Startup).await {
            Ok(report) => info!(
                target: EVENT_TARGET,
                processed = report.processed,
                dry_run = report.dry_run,
                "Startup scan complete. Processed {} members (DRY_RUN={})",
                report.processed,
                report.dry_run
            ),
            Err(e) => error!(target: EVENT_TARGET, error = %e, "Error during startup scan"),
        }
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let tag = ready.user.tag();
        let shard_id = ctx.shard_id;
        info!(target: EVENT_TARGET, "Logged in as {tag}, shard {shard_id}");

        self.startup_scan(&ctx, &ready).await;
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_id = self.data.config.guild_id;
        if !guilds.contains(&guild_id) {
            warn!(
                target: EVENT_TARGET,
                guild_id = %guild_id,
                "Bot is not a member of the configured guild"
            );
        }
        let guild_count = ctx.cache.guild_count();
        info!(target: EVENT_TARGET, "Cache ready! The bot is in {guild_count} guild(s)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_handler_implements_event_handler() {
        fn assert_impl<T: EventHandler>() {}
        assert_impl::<Handler>();
    }

    #[test]
    fn test_handler_shares_startup_claim() {
        let data = Data::new(Config::default_for_test());
        let handler = Handler::new(data.clone());
        assert!(data.claim_startup_scan());
        assert!(!handler.data.claim_startup_scan());
    }
}
