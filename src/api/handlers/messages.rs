use crate::{
    api::{AppState, auth::AuthUser},
    core::messaging::{self, ConversationPage, ConversationSummary, FeedEvent},
    entities::MessageModel,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;

/// `GET /v1/messages?limit=&offset=`
pub async fn conversations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<ConversationPage>,
) -> Result<Json<Vec<ConversationSummary>>> {
    let list = messaging::conversations(&state.db, user.id(), user.is_admin, page).await?;
    Ok(Json(list))
}

/// Message body
#[derive(Debug, Deserialize)]
pub struct SendBody {
    /// Recipient profile id
    pub receiver_id: String,
    /// Text
    pub content: String,
}

/// `POST /v1/messages`
pub async fn send(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SendBody>,
) -> Result<(StatusCode, Json<MessageModel>)> {
    let sent = messaging::send_message(
        &state.db,
        &state.feed,
        user.id(),
        &body.receiver_id,
        &body.content,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

/// `GET /v1/messages/with/{partner}`
pub async fn conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(partner): Path<String>,
) -> Result<Json<Vec<MessageModel>>> {
    let thread = messaging::conversation(&state.db, user.id(), &partner, user.is_admin).await?;
    Ok(Json(thread))
}

/// `POST /v1/messages/with/{partner}/read`
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(partner): Path<String>,
) -> Result<Json<Value>> {
    let updated = messaging::mark_read(&state.db, &state.feed, user.id(), &partner).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// `?partner=` for the live feed
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Conversation partner to follow
    pub partner: String,
}

struct Subscription {
    events: tokio::sync::broadcast::Receiver<FeedEvent>,
    viewer: String,
    partner: String,
    is_admin: bool,
}

/// `GET /v1/messages/stream?partner`: server-sent events for inserts and updates in one
/// conversation.
pub async fn stream(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let subscription = Subscription {
        events: state.feed.subscribe(),
        viewer: user.profile.id,
        partner: query.partner,
        is_admin: user.is_admin,
    };

    let events = futures::stream::unfold(subscription, |mut sub| async move {
        loop {
            match sub.events.recv().await {
                Ok(event) if event.concerns(&sub.viewer, &sub.partner, sub.is_admin) => {
                    let name = match &event {
                        FeedEvent::Insert(_) => "insert",
                        FeedEvent::Update(_) => "update",
                    };
                    let sse = Event::default().event(name).json_data(event.message());
                    return Some((sse, sub));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, viewer = %sub.viewer, "Message feed subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
