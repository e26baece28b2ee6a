use holdem_engine::events::{Audience, Notification, Notifier, TableEvent};
use holdem_engine::player::PlayerId;
use holdem_engine::table::RoomCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

// Slow subscribers are dropped once this many events are queued for them.
const EVENT_CHANNEL_BUFFER: usize = 1000;

pub type EventSender = mpsc::Sender<TableEvent>;
pub type EventReceiver = mpsc::Receiver<TableEvent>;

/// A live feed of one room's events. Unsubscribes when dropped.
pub struct EventSubscription {
    bus: EventBus,
    room: RoomCode,
    subscriber_id: usize,
    pub receiver: EventReceiver,
}

impl EventSubscription {
    pub fn receiver(&mut self) -> &mut EventReceiver {
        &mut self.receiver
    }

    pub fn room(&self) -> &str {
        &self.room
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.room, self.subscriber_id);
    }
}

#[derive(Debug, Clone)]
struct Subscriber {
    id: usize,
    /// Seated player behind this feed; spectators receive room events only
    player_id: Option<PlayerId>,
    sender: EventSender,
}

impl Subscriber {
    fn wants(&self, audience: &Audience) -> bool {
        match audience {
            Audience::Room => true,
            Audience::Player(target) => self.player_id.as_ref() == Some(target),
        }
    }
}

/// Fans table notifications out to SSE subscribers, keyed by room code.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug, Default)]
struct EventBusInner {
    subscribers: RwLock<HashMap<RoomCode, Vec<Subscriber>>>,
    next_id: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, room: RoomCode, player_id: Option<PlayerId>) -> EventSubscription {
        let (tx, receiver) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let subscriber_id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        tracing::info!(
            room = %room,
            subscriber_id,
            player_id = player_id.as_deref().unwrap_or("-"),
            "client subscribed to room events"
        );
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(room.clone())
            .or_default()
            .push(Subscriber {
                id: subscriber_id,
                player_id,
                sender: tx,
            });

        EventSubscription {
            bus: self.clone(),
            room,
            subscriber_id,
            receiver,
        }
    }

    pub fn publish(&self, room: &str, notification: Notification) {
        tracing::debug!(room = %room, audience = ?notification.audience, "publishing table event");

        let targets: Vec<Subscriber> = {
            let guard = self
                .inner
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match guard.get(room) {
                Some(list) => list
                    .iter()
                    .filter(|s| s.wants(&notification.audience))
                    .cloned()
                    .collect(),
                None => return,
            }
        };

        let mut failed = Vec::new();
        for subscriber in targets {
            if let Err(e) = subscriber.sender.try_send(notification.event.clone()) {
                tracing::warn!(
                    room = %room,
                    subscriber_id = subscriber.id,
                    error = %e,
                    "dropping subscriber"
                );
                failed.push(subscriber.id);
            }
        }
        if !failed.is_empty() {
            self.remove_subscribers(room, &failed);
        }
    }

    pub fn unsubscribe(&self, room: &str, subscriber_id: usize) {
        self.remove_subscribers(room, &[subscriber_id]);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Whether the player still has an open feed in any room.
    pub fn is_connected(&self, player_id: &str) -> bool {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flatten()
            .any(|s| s.player_id.as_deref() == Some(player_id))
    }

    fn remove_subscribers(&self, room: &str, ids: &[usize]) {
        let mut guard = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = guard.get_mut(room) {
            list.retain(|s| !ids.contains(&s.id));
            if list.is_empty() {
                guard.remove(room);
            }
        }
    }
}

impl Notifier for EventBus {
    fn deliver(&self, room: &str, notification: Notification) {
        self.publish(room, notification);
    }
}
