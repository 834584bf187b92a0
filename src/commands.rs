use crate::janitor::{ChannelJanitor, purge_messages};
use crate::policy::{GuildDirectory, PurgeError, PurgeResult, ScanOrigin, scan_and_purge};
use crate::{COMMAND_TARGET, Context, Error};
use poise::serenity_prelude::Permissions;
use poise::{CreateReply, command};
use tracing::error;

/// Ban all members without the required role.
#[command(slash_command, guild_only)]
pub async fn purgeunverified(ctx: Context<'_>) -> Result<(), Error> {
    let granted = invoker_permissions(ctx).await;
    if let Err(e) = check_authority(granted, Permissions::BAN_MEMBERS, "Ban Members") {
        reply_ephemeral(ctx, format!("🚫 {e}.")).await?;
        return Ok(());
    }

    reply_ephemeral(ctx, "🔍 Scanning for unverified members...").await?;

    let config = &ctx.data().config;
    let directory = GuildDirectory::new(ctx.http(), config.guild_id, ctx.framework().bot_id);
    match scan_and_purge(&directory, &config.policy, ScanOrigin::Command).await {
        Ok(report) => {
            ctx.say(format!(
                "✅ Purge complete. Processed {} members (DRY_RUN={}).",
                report.processed, report.dry_run
            ))
            .await?;
        }
        Err(e) => {
            error!(target: COMMAND_TARGET, error = %e, "Error during purge");
            ctx.say("❌ Error during purge.").await?;
        }
    }

    Ok(())
}

/// Delete recent messages in this channel.
#[command(slash_command, guild_only)]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "Number of messages to delete (1–100)"] amount: i64,
) -> Result<(), Error> {
    let granted = invoker_permissions(ctx).await;
    if let Err(e) = check_authority(granted, Permissions::MANAGE_MESSAGES, "Manage Messages") {
        reply_ephemeral(ctx, format!("🚫 {e}.")).await?;
        return Ok(());
    }

    let janitor = ChannelJanitor::new(ctx.http());
    let content = match purge_messages(&janitor, ctx.channel_id(), amount).await {
        Ok(deleted) => format!("✅ Purged {deleted} messages."),
        Err(PurgeError::AmountOutOfRange(_)) => {
            "⚠️ Amount must be between 1 and 100.".to_string()
        }
        Err(e) => {
            error!(target: COMMAND_TARGET, error = %e, "Failed to purge messages");
            "❌ Failed to purge messages.".to_string()
        }
    };
    reply_ephemeral(ctx, content).await?;

    Ok(())
}

/// Check that `granted` covers `required`. Administrators pass every check.
pub fn check_authority(
    granted: Permissions,
    required: Permissions,
    name: &'static str,
) -> PurgeResult<()> {
    if granted.administrator() || granted.contains(required) {
        Ok(())
    } else {
        Err(PurgeError::MissingPermission(name))
    }
}

/// Guild permissions of the invoking member, as resolved by Discord for the interaction
async fn invoker_permissions(ctx: Context<'_>) -> Permissions {
    ctx.author_member()
        .await
        .and_then(|member| member.permissions)
        .unwrap_or_else(Permissions::empty)
}

async fn reply_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purgeunverified_command_definition() {
        let cmd = purgeunverified();
        assert_eq!(cmd.name, "purgeunverified");
        assert!(
            cmd.description.clone()
                .unwrap_or_default()
                .contains("without the required role")
        );
        assert!(cmd.guild_only);
        assert!(cmd.parameters.is_empty());
        assert!(cmd.create_as_slash_command().is_some());
    }

    #[test]
    fn test_purge_command_definition() {
        let cmd = purge();
        assert_eq!(cmd.name, "purge");
        assert!(cmd.guild_only);
        assert_eq!(cmd.parameters.len(), 1);
        assert_eq!(cmd.parameters[0].name, "amount");
        assert!(cmd.parameters[0].required);
        assert!(cmd.create_as_slash_command().is_some());
    }

    #[test]
    fn test_check_authority() {
        assert!(
            check_authority(Permissions::BAN_MEMBERS, Permissions::BAN_MEMBERS, "Ban Members")
                .is_ok()
        );
        assert!(
            check_authority(
                Permissions::ADMINISTRATOR,
                Permissions::MANAGE_MESSAGES,
                "Manage Messages"
            )
            .is_ok()
        );

        let err =
            check_authority(Permissions::SEND_MESSAGES, Permissions::BAN_MEMBERS, "Ban Members")
                .unwrap_err();
        assert_eq!(err.to_string(), "You lack `Ban Members` permission");

        assert!(
            check_authority(Permissions::empty(), Permissions::MANAGE_MESSAGES, "Manage Messages")
                .is_err()
        );
    }
}
