/// Change notifications for connected clients
///
/// This module provides the in-process event hub behind the SSE change feed.
/// Every successful mutation publishes a [`ChangeEvent`] naming the entity
/// collection that changed; each connected client holds a broadcast receiver
/// and refetches the named collection when an event for its user arrives.
///
/// Events are fire-and-forget. A client that falls behind misses events and
/// is expected to refetch on reconnect, so nothing is persisted.
///
/// # Example
///
/// ```
/// use taskflow_shared::events::{ChangeAction, ChangeEvent, EntityKind, EventHub};
/// use uuid::Uuid;
///
/// # async fn example() {
/// let hub = EventHub::default();
/// let mut rx = hub.subscribe();
///
/// let user_id = Uuid::new_v4();
/// hub.publish(ChangeEvent::new(
///     user_id,
///     EntityKind::Tasks,
///     ChangeAction::Created,
///     Uuid::new_v4(),
/// ));
///
/// let event = rx.recv().await.unwrap();
/// assert_eq!(event.user_id, user_id);
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default broadcast capacity
///
/// Events older than this are dropped for lagging receivers; the SSE layer
/// treats a lagged receiver as a signal to let the client reconnect.
const DEFAULT_CAPACITY: usize = 256;

/// Entity collection a change event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Client records
    Clients,

    /// Tasks and their dependency links
    Tasks,

    /// Planner schedule items
    Schedule,

    /// User settings and availability windows
    Settings,
}

impl EntityKind {
    /// Gets entity kind as string
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Clients => "clients",
            EntityKind::Tasks => "tasks",
            EntityKind::Schedule => "schedule",
            EntityKind::Settings => "settings",
        }
    }
}

/// What happened to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// New record created
    Created,

    /// Existing record modified
    Updated,

    /// Record removed
    Deleted,
}

/// A single change notification
///
/// Carries enough for a client to decide what to refetch, not the changed
/// data itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Owner of the changed record
    pub user_id: Uuid,

    /// Which collection changed
    pub entity: EntityKind,

    /// What happened
    pub action: ChangeAction,

    /// ID of the changed record
    pub id: Uuid,

    /// When the change was published
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates a change event stamped with the current time
    pub fn new(user_id: Uuid, entity: EntityKind, action: ChangeAction, id: Uuid) -> Self {
        Self {
            user_id,
            entity,
            action,
            at: Utc::now(),
            id,
        }
    }
}

/// In-process fan-out hub for change events
///
/// Cheap to clone and share through application state. Publishing never
/// blocks; subscribers each get their own buffered receiver.
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventHub {
    /// Creates a hub with the given per-subscriber buffer capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers
    ///
    /// Send fails only when no subscriber is connected, which is not an
    /// error for a fire-and-forget feed.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    /// Creates a new subscription
    ///
    /// The receiver sees events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let hub = EventHub::default();
        let mut rx = hub.subscribe();

        let user_id = Uuid::new_v4();
        let record_id = Uuid::new_v4();
        hub.publish(ChangeEvent::new(
            user_id,
            EntityKind::Tasks,
            ChangeAction::Updated,
            record_id,
        ));

        let event = rx.recv().await.expect("Should receive event");
        assert_eq!(event.user_id, user_id);
        assert_eq!(event.entity, EntityKind::Tasks);
        assert_eq!(event.action, ChangeAction::Updated);
        assert_eq!(event.id, record_id);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = EventHub::default();

        // No receiver connected; publish must not panic or error out
        hub.publish(ChangeEvent::new(
            Uuid::new_v4(),
            EntityKind::Clients,
            ChangeAction::Deleted,
            Uuid::new_v4(),
        ));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let hub = EventHub::default();
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();

        hub.publish(ChangeEvent::new(
            Uuid::new_v4(),
            EntityKind::Schedule,
            ChangeAction::Created,
            Uuid::new_v4(),
        ));

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_subscriber_misses_earlier_events() {
        let hub = EventHub::default();

        hub.publish(ChangeEvent::new(
            Uuid::new_v4(),
            EntityKind::Settings,
            ChangeAction::Updated,
            Uuid::new_v4(),
        ));

        // Subscribed after the publish, so the buffer is empty
        let mut rx = hub.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_wire_format() {
        let event = ChangeEvent::new(
            Uuid::new_v4(),
            EntityKind::Schedule,
            ChangeAction::Created,
            Uuid::new_v4(),
        );

        let json = serde_json::to_string(&event).expect("Should serialize");
        assert!(json.contains("\"entity\":\"schedule\""));
        assert!(json.contains("\"action\":\"created\""));
    }

    #[test]
    fn test_entity_kind_as_str() {
        assert_eq!(EntityKind::Clients.as_str(), "clients");
        assert_eq!(EntityKind::Tasks.as_str(), "tasks");
        assert_eq!(EntityKind::Schedule.as_str(), "schedule");
        assert_eq!(EntityKind::Settings.as_str(), "settings");
    }
}
