//! Bulk message deletion for the `/purge` command

use crate::policy::{PurgeError, PurgeResult};
use chrono::Utc;
use poise::serenity_prelude::{ChannelId, GetMessages, Http, MessageId};
use tracing::info;

#[cfg(test)]
use mockall::automock;

/// Smallest purge the command accepts
pub const MIN_PURGE: i64 = 1;
/// Largest purge the command accepts (Discord's bulk delete limit)
pub const MAX_PURGE: i64 = 100;

/// Discord refuses to bulk delete messages older than two weeks
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;

/// Deletes recent messages from a channel
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait MessageJanitor: Send + Sync {
    /// Delete up to `amount` of the most recent messages, returning how many were removed
    async fn delete_recent(&self, channel_id: ChannelId, amount: u8) -> PurgeResult<usize>;
}

/// Check a purge amount is within 1..=100
pub fn validate_purge_amount(amount: i64) -> PurgeResult<u8> {
    if (MIN_PURGE..=MAX_PURGE).contains(&amount) {
        u8::try_from(amount).map_err(|_| PurgeError::AmountOutOfRange(amount))
    } else {
        Err(PurgeError::AmountOutOfRange(amount))
    }
}

/// Validate `amount` and delete that many recent messages from `channel_id`.
///
/// # Errors
///
/// Returns [`PurgeError::AmountOutOfRange`] without touching the channel when
/// the amount is invalid, or the janitor's error if deletion fails.
pub async fn purge_messages<J>(
    janitor: &J,
    channel_id: ChannelId,
    amount: i64,
) -> PurgeResult<usize>
where
    J: MessageJanitor + ?Sized,
{
    let amount = validate_purge_amount(amount)?;
    let deleted = janitor.delete_recent(channel_id, amount).await?;
    info!(
        channel_id = %channel_id,
        requested = amount,
        deleted = deleted,
        "Purged messages"
    );
    Ok(deleted)
}

/// Ids of the messages young enough to be bulk deleted.
///
/// `messages` pairs each id with its creation time in unix seconds. A message
/// exactly at the two-week boundary is already too old.
pub fn select_recent(messages: &[(MessageId, i64)], now: i64) -> Vec<MessageId> {
    let cutoff = now - BULK_DELETE_MAX_AGE_SECS;
    messages
        .iter()
        .filter(|(_, created)| *created > cutoff)
        .map(|(id, _)| *id)
        .collect()
}

/// How a batch of messages is removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePlan {
    Nothing,
    /// Bulk delete rejects a single message, so it goes through the plain endpoint
    Single(MessageId),
    Bulk(Vec<MessageId>),
}

impl DeletePlan {
    pub fn new(ids: Vec<MessageId>) -> Self {
        match ids.as_slice() {
            [] => Self::Nothing,
            [id] => Self::Single(*id),
            _ => Self::Bulk(ids),
        }
    }

    /// Number of messages the plan removes
    pub fn len(&self) -> usize {
        match self {
            Self::Nothing => 0,
            Self::Single(_) => 1,
            Self::Bulk(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Nothing)
    }
}

/// [`MessageJanitor`] backed by the Discord REST API
pub struct ChannelJanitor<'a> {
    http: &'a Http,
}

impl<'a> ChannelJanitor<'a> {
    pub fn new(http: &'a Http) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl MessageJanitor for ChannelJanitor<'_> {
    async fn delete_recent(&self, channel_id: ChannelId, amount: u8) -> PurgeResult<usize> {
        let messages = channel_id
            .messages(self.http, GetMessages::new().limit(amount))
            .await?;
        let created: Vec<(MessageId, i64)> = messages
            .iter()
            .map(|message| (message.id, message.timestamp.unix_timestamp()))
            .collect();

        let plan = DeletePlan::new(select_recent(&created, Utc::now().timestamp()));
        match &plan {
            DeletePlan::Nothing => {}
            DeletePlan::Single(message_id) => {
                channel_id.delete_message(self.http, *message_id).await?;
            }
            DeletePlan::Bulk(ids) => channel_id.delete_messages(self.http, ids).await?,
        }

        Ok(plan.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude as serenity;

    #[test]
    fn test_validate_purge_amount() {
        assert_eq!(validate_purge_amount(1).unwrap(), 1);
        assert_eq!(validate_purge_amount(50).unwrap(), 50);
        assert_eq!(validate_purge_amount(100).unwrap(), 100);
        assert!(matches!(
            validate_purge_amount(0),
            Err(PurgeError::AmountOutOfRange(0))
        ));
        assert!(matches!(
            validate_purge_amount(101),
            Err(PurgeError::AmountOutOfRange(101))
        ));
        assert!(validate_purge_amount(-5).is_err());
    }

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_select_recent_cutoff() {
        let cutoff = NOW - BULK_DELETE_MAX_AGE_SECS;
        let messages = [
            (MessageId::new(1), NOW),
            (MessageId::new(2), cutoff + 1),
            (MessageId::new(3), cutoff),
            (MessageId::new(4), cutoff - 3600),
        ];

        assert_eq!(
            select_recent(&messages, NOW),
            vec![MessageId::new(1), MessageId::new(2)]
        );
        assert!(select_recent(&[], NOW).is_empty());
    }

    #[test]
    fn test_delete_plan() {
        let plan = DeletePlan::new(vec![]);
        assert_eq!(plan, DeletePlan::Nothing);
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);

        let plan = DeletePlan::new(vec![MessageId::new(7)]);
        assert_eq!(plan, DeletePlan::Single(MessageId::new(7)));
        assert_eq!(plan.len(), 1);

        let ids = vec![MessageId::new(7), MessageId::new(8), MessageId::new(9)];
        let plan = DeletePlan::new(ids.clone());
        assert_eq!(plan, DeletePlan::Bulk(ids));
        assert_eq!(plan.len(), 3);
        assert!(!plan.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_never_deletes() {
        let mut janitor = MockMessageJanitor::new();
        janitor.expect_delete_recent().never();

        for amount in [0, 101] {
            let result = purge_messages(&janitor, ChannelId::new(9), amount).await;
            assert!(matches!(result, Err(PurgeError::AmountOutOfRange(a)) if a == amount));
        }
    }

    #[tokio::test]
    async fn test_purge_requests_amount() {
        let mut janitor = MockMessageJanitor::new();
        janitor
            .expect_delete_recent()
            .withf(|channel_id, amount| *channel_id == ChannelId::new(9) && *amount == 50)
            .times(1)
            .returning(|_, _| Ok(42));

        let deleted = purge_messages(&janitor, ChannelId::new(9), 50).await.unwrap();
        assert_eq!(deleted, 42);
    }

    #[tokio::test]
    async fn test_purge_propagates_failure() {
        let mut janitor = MockMessageJanitor::new();
        janitor
            .expect_delete_recent()
            .times(1)
            .returning(|_, _| Err(PurgeError::from(serenity::Error::Other("Missing Access"))));

        let result = purge_messages(&janitor, ChannelId::new(9), 10).await;
        assert!(matches!(result, Err(PurgeError::DiscordApi(_))));
    }
}
