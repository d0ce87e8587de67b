use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::{Notification, NotificationFeed};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::AppError,
    routes::auth::{current_user, verify_token},
    state::AppState,
};

const NOTIFICATION_PAGE_SIZE: i64 = 50;

/// GET /notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user = current_user(&state, &headers).await?;
    let notifications = state
        .db
        .list_notifications(&user.id, NOTIFICATION_PAGE_SIZE)
        .await?
        .into_iter()
        .map(|row| row.into_notification())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(notifications))
}

/// GET /notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = current_user(&state, &headers).await?;
    let count = state.db.unread_count(&user.id).await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

/// Mark a notification read. Idempotent: marking an already-read notification
/// succeeds without effect.
/// POST /notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = current_user(&state, &headers).await?;

    let notification = state
        .db
        .get_notification(&notification_id)
        .await?
        .filter(|n| n.recipient_id == user.id)
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    if !notification.read {
        state.db.mark_notification_read(&notification_id).await?;
    }

    // Keep any other open tabs in sync.
    let count = state.db.unread_count(&user.id).await?;
    state
        .notifications
        .push(&user.id, NotificationFeed::UnreadCount { count })
        .await;

    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: String,
}

/// Live notification feed. Browsers cannot set headers on WebSocket requests,
/// so the token travels as a query parameter.
/// GET /ws/notifications?token=...
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsAuthQuery>,
) -> Result<impl IntoResponse, AppError> {
    let claims = verify_token(&query.token, &state.config.auth.jwt_secret)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, claims.sub)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = Uuid::new_v4();

    // Channel for events destined for this connection
    let (tx, mut rx) = mpsc::channel::<NotificationFeed>(32);
    state
        .notifications
        .subscribe(connection_id, user_id.clone(), tx.clone());

    // Forward events from the hub to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to serialize notification event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Seed the subscriber with the current unread count.
    match state.db.unread_count(&user_id).await {
        Ok(count) => {
            let _ = tx.send(NotificationFeed::UnreadCount { count }).await;
        }
        Err(e) => tracing::error!("Failed to load unread count for {}: {:#}", user_id, e),
    }

    // The feed is one-way; drain incoming frames until the client goes away.
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }

    // Cleanup runs on every exit path of this handler.
    state.notifications.unsubscribe(&connection_id);
    send_task.abort();
    tracing::info!("Notification subscriber disconnected: {}", connection_id);
}
