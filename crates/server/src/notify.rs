use dashmap::DashMap;
use shared::NotificationFeed;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Tracks live WebSocket subscribers to the notification feed and fans events
/// out to the connections belonging to a given user. A user may have several
/// open tabs, so connections are keyed by connection id, not user id.
pub struct NotificationHub {
    /// Map of connection ID -> (user ID, sender to that connection)
    subscribers: DashMap<Uuid, Subscriber>,
}

struct Subscriber {
    user_id: String,
    tx: mpsc::Sender<NotificationFeed>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    pub fn subscribe(
        &self,
        connection_id: Uuid,
        user_id: String,
        tx: mpsc::Sender<NotificationFeed>,
    ) {
        tracing::info!("Notification subscriber registered: {} ({})", connection_id, user_id);
        self.subscribers.insert(connection_id, Subscriber { user_id, tx });
    }

    pub fn unsubscribe(&self, connection_id: &Uuid) {
        if self.subscribers.remove(connection_id).is_some() {
            tracing::info!("Notification subscriber unregistered: {}", connection_id);
        }
    }

    /// Sends an event to every live connection for the user. A full or closed
    /// channel just drops the event; the REST endpoints remain the source of
    /// truth on reconnect.
    pub async fn push(&self, user_id: &str, event: NotificationFeed) {
        let targets: Vec<mpsc::Sender<NotificationFeed>> = self
            .subscribers
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.tx.clone())
            .collect();

        for tx in targets {
            let _ = tx.send(event.clone()).await;
        }
    }
}
