//! Direct messaging between accounts and the in-process change feed that powers live
//! conversation views.

use crate::{
    core::profile,
    entities::{Message, message},
    errors::{Error, Result},
};
use sea_orm::{
    Condition, FromQueryResult, QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

/// A change to a message row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "message", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A message was sent
    Insert(message::Model),
    /// A message was updated (marked read)
    Update(message::Model),
}

impl FeedEvent {
    /// The affected row.
    #[must_use]
    pub const fn message(&self) -> &message::Model {
        match self {
            Self::Insert(m) | Self::Update(m) => m,
        }
    }

    /// Whether this event belongs to the conversation `viewer` has open with `partner`.
    /// Admins follow every message involving the partner.
    #[must_use]
    pub fn concerns(&self, viewer: &str, partner: &str, is_admin: bool) -> bool {
        let m = self.message();
        if is_admin {
            return m.sender_id == partner || m.receiver_id == partner;
        }
        (m.sender_id == viewer && m.receiver_id == partner)
            || (m.sender_id == partner && m.receiver_id == viewer)
    }
}

/// Broadcasts message changes to live subscribers. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct MessageFeed {
    sender: broadcast::Sender<FeedEvent>,
}

impl MessageFeed {
    /// Creates a feed that buffers up to `capacity` events per slow subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event; having no subscribers is fine.
    pub fn publish(&self, event: FeedEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribes to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.sender.subscribe()
    }
}

impl Default for MessageFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Fields of a message row to insert
#[derive(Debug, Clone)]
pub(crate) struct NewMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub is_enquiry: bool,
    pub enquiry_id: Option<String>,
    pub is_admin_copy: bool,
}

pub(crate) async fn insert_message<C: ConnectionTrait>(
    db: &C,
    new: NewMessage,
) -> Result<message::Model> {
    let model = message::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        sender_id: Set(new.sender_id),
        receiver_id: Set(new.receiver_id),
        content: Set(new.content),
        read: Set(false),
        is_enquiry: Set(new.is_enquiry),
        enquiry_id: Set(new.enquiry_id),
        is_admin_copy: Set(new.is_admin_copy),
        created_at: Set(chrono::Utc::now()),
    };
    model.insert(db).await.map_err(Into::into)
}

/// Sends a plain message.
pub async fn send_message(
    db: &DatabaseConnection,
    feed: &MessageFeed,
    sender_id: &str,
    receiver_id: &str,
    content: &str,
) -> Result<message::Model> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::validation("Message cannot be empty"));
    }
    if sender_id == receiver_id {
        return Err(Error::validation("Cannot send a message to yourself"));
    }
    if profile::get_profile(db, receiver_id).await?.is_none() {
        return Err(Error::not_found("profile", receiver_id));
    }

    let sent = insert_message(
        db,
        NewMessage {
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            is_enquiry: false,
            enquiry_id: None,
            is_admin_copy: false,
        },
    )
    .await?;
    feed.publish(FeedEvent::Insert(sent.clone()));
    Ok(sent)
}

fn between(a: &str, b: &str) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(message::Column::SenderId.eq(a))
                .add(message::Column::ReceiverId.eq(b)),
        )
        .add(
            Condition::all()
                .add(message::Column::SenderId.eq(b))
                .add(message::Column::ReceiverId.eq(a)),
        )
}

fn involving(user: &str) -> Condition {
    Condition::any()
        .add(message::Column::SenderId.eq(user))
        .add(message::Column::ReceiverId.eq(user))
}

/// Messages between `viewer` and `partner`, oldest first. Admins see every message
/// involving the partner.
pub async fn conversation(
    db: &DatabaseConnection,
    viewer_id: &str,
    partner_id: &str,
    is_admin: bool,
) -> Result<Vec<message::Model>> {
    let condition = if is_admin {
        involving(partner_id)
    } else {
        between(viewer_id, partner_id)
    };
    Message::find()
        .filter(condition)
        .order_by_asc(message::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks every unread message from `partner` to `viewer` as read and publishes the
/// updates. Returns how many rows changed.
pub async fn mark_read(
    db: &DatabaseConnection,
    feed: &MessageFeed,
    viewer_id: &str,
    partner_id: &str,
) -> Result<u64> {
    let unread = Message::find()
        .filter(message::Column::SenderId.eq(partner_id))
        .filter(message::Column::ReceiverId.eq(viewer_id))
        .filter(message::Column::Read.eq(false))
        .all(db)
        .await?;
    if unread.is_empty() {
        return Ok(0);
    }

    let ids: Vec<String> = unread.iter().map(|m| m.id.clone()).collect();
    let result = Message::update_many()
        .col_expr(message::Column::Read, Expr::value(true))
        .filter(message::Column::Id.is_in(ids))
        .exec(db)
        .await?;

    for mut m in unread {
        m.read = true;
        feed.publish(FeedEvent::Update(m));
    }
    Ok(result.rows_affected)
}

/// One row of the conversation list
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    /// The other account
    pub partner_id: String,
    /// Partner display name
    pub partner_name: String,
    /// Partner avatar
    pub avatar_url: Option<String>,
    /// Most recent message in the conversation
    pub last_message: message::Model,
    /// Messages from the partner the viewer has not read
    pub unread: u64,
}

/// Paging for the conversation list
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConversationPage {
    /// Conversations per page (default 50, at most 100)
    pub limit: Option<u64>,
    /// Conversations to skip
    pub offset: Option<u64>,
}

const DEFAULT_CONVERSATIONS: u64 = 50;
const MAX_CONVERSATIONS: u64 = 100;

#[derive(Debug, FromQueryResult)]
struct PartnerActivity {
    partner_id: String,
    last_at: DateTimeUtc,
}

#[derive(Debug, FromQueryResult)]
struct UnreadCount {
    partner_id: String,
    unread: i64,
}

/// Latest message time per account in `partner`, grouped in SQL. Unless `is_admin`,
/// only rows where `viewer` is in `own` are counted.
async fn partner_activity(
    db: &DatabaseConnection,
    viewer_id: &str,
    is_admin: bool,
    partner: message::Column,
    own: message::Column,
) -> Result<Vec<PartnerActivity>> {
    let mut query = Message::find()
        .select_only()
        .column_as(partner, "partner_id")
        .column_as(message::Column::CreatedAt.max(), "last_at")
        .group_by(partner);
    if !is_admin {
        query = query.filter(own.eq(viewer_id));
    }
    query
        .into_model::<PartnerActivity>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Conversations of `viewer`, most recently active first.
///
/// Admins see every account that has exchanged messages, with the last message involving
/// that account. Only the requested page of partners is loaded.
pub async fn conversations(
    db: &DatabaseConnection,
    viewer_id: &str,
    is_admin: bool,
    page: ConversationPage,
) -> Result<Vec<ConversationSummary>> {
    use message::Column::{ReceiverId, SenderId};

    let received = partner_activity(db, viewer_id, is_admin, SenderId, ReceiverId).await?;
    let sent = partner_activity(db, viewer_id, is_admin, ReceiverId, SenderId).await?;
    let mut latest: HashMap<String, DateTimeUtc> = HashMap::new();
    for row in received.into_iter().chain(sent) {
        if row.partner_id == viewer_id {
            continue;
        }
        latest
            .entry(row.partner_id)
            .and_modify(|at| *at = (*at).max(row.last_at))
            .or_insert(row.last_at);
    }

    let mut ordered: Vec<(String, DateTimeUtc)> = latest.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let limit = page
        .limit
        .unwrap_or(DEFAULT_CONVERSATIONS)
        .clamp(1, MAX_CONVERSATIONS);
    let offset = usize::try_from(page.offset.unwrap_or(0)).unwrap_or(usize::MAX);
    let partners: Vec<String> = ordered
        .into_iter()
        .skip(offset)
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .map(|(id, _)| id)
        .collect();
    if partners.is_empty() {
        return Ok(Vec::new());
    }

    let unread: HashMap<String, u64> = Message::find()
        .select_only()
        .column_as(SenderId, "partner_id")
        .column_as(message::Column::Id.count(), "unread")
        .filter(ReceiverId.eq(viewer_id))
        .filter(message::Column::Read.eq(false))
        .filter(SenderId.is_in(partners.iter().cloned()))
        .group_by(SenderId)
        .into_model::<UnreadCount>()
        .all(db)
        .await?
        .into_iter()
        .map(|row| (row.partner_id, u64::try_from(row.unread).unwrap_or(0)))
        .collect();

    let profiles = profile::get_profiles_by_ids(db, &partners).await?;
    let mut summaries = Vec::with_capacity(partners.len());
    for partner_id in partners {
        let scope = if is_admin {
            involving(&partner_id)
        } else {
            between(viewer_id, &partner_id)
        };
        let Some(last_message) = Message::find()
            .filter(scope)
            .order_by_desc(message::Column::CreatedAt)
            .one(db)
            .await?
        else {
            continue;
        };
        let partner = profiles.get(&partner_id);
        summaries.push(ConversationSummary {
            partner_name: profile::display_name(partner),
            avatar_url: partner.and_then(|p| p.avatar_url.clone()),
            unread: unread.get(&partner_id).copied().unwrap_or(0),
            partner_id,
            last_message,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_send_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = MessageFeed::default();
        let a = create_test_profile(&db, "alice").await?;

        assert!(matches!(
            send_message(&db, &feed, &a.id, &a.id, "hi").await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            send_message(&db, &feed, &a.id, "ghost", "hi").await,
            Err(Error::NotFound { .. })
        ));
        let b = create_test_profile(&db, "bob").await?;
        assert!(matches!(
            send_message(&db, &feed, &a.id, &b.id, "   ").await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_conversation_and_read_receipts() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = MessageFeed::default();
        let mut events = feed.subscribe();
        let a = create_test_profile(&db, "alice").await?;
        let b = create_test_profile(&db, "bob").await?;
        let c = create_test_profile(&db, "carol").await?;

        send_message(&db, &feed, &a.id, &b.id, "Hello Bob").await?;
        send_message(&db, &feed, &b.id, &a.id, "Hi Alice").await?;
        send_message(&db, &feed, &c.id, &a.id, "Carol here").await?;

        let thread = conversation(&db, &a.id, &b.id, false).await?;
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].content, "Hello Bob");

        let first = events.recv().await.unwrap();
        assert!(matches!(first, FeedEvent::Insert(_)));
        assert!(first.concerns(&b.id, &a.id, false));
        assert!(!first.concerns(&c.id, &a.id, false));

        let changed = mark_read(&db, &feed, &a.id, &b.id).await?;
        assert_eq!(changed, 1);
        assert_eq!(mark_read(&db, &feed, &a.id, &b.id).await?, 0);

        // Skip the two remaining inserts to reach the update
        events.recv().await.unwrap();
        events.recv().await.unwrap();
        let update = events.recv().await.unwrap();
        assert!(matches!(&update, FeedEvent::Update(m) if m.read && m.content == "Hi Alice"));
        Ok(())
    }

    #[tokio::test]
    async fn test_conversation_list() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = MessageFeed::default();
        let a = create_test_profile(&db, "alice").await?;
        let b = create_test_profile(&db, "bob").await?;
        let c = create_test_profile(&db, "carol").await?;

        send_message(&db, &feed, &b.id, &a.id, "from bob").await?;
        send_message(&db, &feed, &c.id, &a.id, "from carol 1").await?;
        send_message(&db, &feed, &c.id, &a.id, "from carol 2").await?;

        let list = conversations(&db, &a.id, false, ConversationPage::default()).await?;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].partner_id, c.id);
        assert_eq!(list[0].last_message.content, "from carol 2");
        let carol = list.iter().find(|s| s.partner_id == c.id).unwrap();
        assert_eq!(carol.unread, 2);
        assert_eq!(carol.partner_name, "carol Trading");
        let bob = list.iter().find(|s| s.partner_id == b.id).unwrap();
        assert_eq!(bob.unread, 1);
        assert_eq!(bob.last_message.content, "from bob");

        // Bob only sees his conversation with Alice
        let bobs = conversations(&db, &b.id, false, ConversationPage::default()).await?;
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].partner_id, a.id);
        assert_eq!(bobs[0].unread, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_sees_all_conversations() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = MessageFeed::default();
        let admin = create_admin_profile(&db, "ops").await?;
        let a = create_test_profile(&db, "alice").await?;
        let b = create_test_profile(&db, "bob").await?;

        send_message(&db, &feed, &a.id, &b.id, "private").await?;

        let list = conversations(&db, &admin.id, true, ConversationPage::default()).await?;
        assert_eq!(list.len(), 2);
        let thread = conversation(&db, &admin.id, &b.id, true).await?;
        assert_eq!(thread.len(), 1);
        assert!(FeedEvent::Insert(thread[0].clone()).concerns(&admin.id, &a.id, true));
        Ok(())
    }

    #[tokio::test]
    async fn test_conversation_list_pages_by_recent_activity() -> Result<()> {
        let db = setup_test_db().await?;
        let feed = MessageFeed::default();
        let a = create_test_profile(&db, "alice").await?;
        let b = create_test_profile(&db, "bob").await?;
        let c = create_test_profile(&db, "carol").await?;
        let d = create_test_profile(&db, "dave").await?;

        send_message(&db, &feed, &b.id, &a.id, "from bob").await?;
        send_message(&db, &feed, &a.id, &c.id, "to carol").await?;
        send_message(&db, &feed, &d.id, &a.id, "from dave").await?;
        send_message(&db, &feed, &a.id, &b.id, "to bob").await?;
        // Unrelated traffic is not counted for alice
        send_message(&db, &feed, &c.id, &d.id, "carol to dave").await?;

        let first = ConversationPage {
            limit: Some(2),
            offset: None,
        };
        let list = conversations(&db, &a.id, false, first).await?;
        let ids: Vec<&str> = list.iter().map(|s| s.partner_id.as_str()).collect();
        assert_eq!(ids, [b.id.as_str(), d.id.as_str()]);
        assert_eq!(list[0].last_message.content, "to bob");
        assert_eq!(list[0].unread, 1);
        assert_eq!(list[1].unread, 1);

        let second = ConversationPage {
            limit: Some(2),
            offset: Some(2),
        };
        let list = conversations(&db, &a.id, false, second).await?;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].partner_id, c.id);
        assert_eq!(list[0].last_message.content, "to carol");
        assert_eq!(list[0].unread, 0);

        let past_end = ConversationPage {
            limit: Some(2),
            offset: Some(10),
        };
        assert!(conversations(&db, &a.id, false, past_end).await?.is_empty());
        Ok(())
    }
}
