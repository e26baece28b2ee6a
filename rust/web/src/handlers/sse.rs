use crate::errors::IntoErrorResponse;
use crate::events::{EventBus, EventSubscription};
use holdem_engine::errors::GameError;
use holdem_engine::events::TableEvent;
use holdem_engine::lobby::Lobby;
use holdem_engine::player::PlayerId;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use warp::http;
use warp::reply::{self, Response};
use warp::sse;
use warp::Reply;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Seated player behind this stream. Omit to watch as a spectator.
    pub player_id: Option<PlayerId>,
}

/// Opens the room's event stream.
///
/// The first event is always a `state_update`; a seated player also gets
/// their current `private_hand`. When the last stream of a seated player
/// closes, they are disconnected from every room.
pub async fn stream_events(
    code: String,
    query: EventsQuery,
    lobby: Arc<Lobby>,
    event_bus: Arc<EventBus>,
) -> Response {
    let code = code.trim().to_ascii_uppercase();

    let subscription = event_bus.subscribe(code.clone(), query.player_id.clone());
    let initial = match initial_events(&lobby, &code, query.player_id.as_deref()) {
        Ok(events) => events,
        Err(err) => return err.into_http_response(),
    };

    let connection = Connection {
        subscription: Some(subscription),
        player_id: query.player_id,
        lobby,
        event_bus,
    };
    let keep_alive = sse::keep_alive()
        .interval(Duration::from_secs(15))
        .text(":keep-alive\n");

    let reply = sse::reply(keep_alive.stream(connection.into_stream(initial)));
    reply::with_header(reply, http::header::CACHE_CONTROL, "no-cache").into_response()
}

fn initial_events(
    lobby: &Lobby,
    code: &str,
    player_id: Option<&str>,
) -> Result<Vec<TableEvent>, GameError> {
    lobby.inspect(code, |table| {
        let mut events = vec![TableEvent::StateUpdate {
            snapshot: table.snapshot(),
        }];
        match player_id {
            None => Ok(events),
            Some(id) => {
                let player = table
                    .player(id)
                    .ok_or_else(|| GameError::PlayerNotFound(id.to_string()))?;
                if !player.hand().is_empty() {
                    events.push(TableEvent::PrivateHand {
                        player_id: id.to_string(),
                        cards: player.hand().to_vec(),
                    });
                }
                Ok(events)
            }
        }
    })?
}

/// One open SSE stream. Dropped by warp when the client goes away.
struct Connection {
    subscription: Option<EventSubscription>,
    player_id: Option<PlayerId>,
    lobby: Arc<Lobby>,
    event_bus: Arc<EventBus>,
}

impl Connection {
    fn into_stream(
        mut self,
        initial: Vec<TableEvent>,
    ) -> impl tokio_stream::Stream<Item = Result<sse::Event, Infallible>> + Send + 'static {
        let receiver = match self.subscription.as_mut() {
            Some(subscription) => {
                let (_, placeholder) = mpsc::channel(1);
                std::mem::replace(&mut subscription.receiver, placeholder)
            }
            None => mpsc::channel(1).1,
        };

        tokio_stream::iter(initial)
            .chain(ReceiverStream::new(receiver))
            .map(move |event| {
                let _open = &self;
                Ok(render_event(&event))
            })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let room = match self.subscription.take() {
            Some(subscription) => subscription.room().to_string(),
            None => return,
        };
        let Some(player_id) = self.player_id.take() else {
            return;
        };
        if self.event_bus.is_connected(&player_id) {
            return;
        }
        match self.lobby.disconnect(&player_id) {
            Ok(rooms) => info!(room = %room, player_id = %player_id, left = ?rooms, "event stream closed"),
            Err(err) => warn!(room = %room, player_id = %player_id, error = %err, "disconnect failed"),
        }
    }
}

pub(crate) fn event_name(event: &TableEvent) -> &'static str {
    match event {
        TableEvent::PrivateHand { .. } => "private_hand",
        TableEvent::StateUpdate { .. } => "state_update",
        TableEvent::ActionTaken { .. } => "action_taken",
        TableEvent::Winner { .. } => "winner",
        TableEvent::ChooseWinnerRequest { .. } => "choose_winner_request",
        TableEvent::HandCompleted { .. } => "hand_completed",
    }
}

fn render_event(event: &TableEvent) -> sse::Event {
    let name = event_name(event);
    match serde_json::to_string(event) {
        Ok(json) => sse::Event::default().event(name).data(json),
        Err(err) => {
            let fallback = serde_json::json!({
                "type": "error",
                "message": format!("failed to serialize {name}: {err}")
            })
            .to_string();
            sse::Event::default().event("error").data(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdem_engine::events::Notifier;
    use holdem_engine::table::TableConfig;

    fn setup() -> (Arc<Lobby>, Arc<EventBus>, String) {
        let bus = Arc::new(EventBus::new());
        let notifier: Arc<dyn Notifier> = bus.clone();
        let lobby = Arc::new(Lobby::new(TableConfig::default(), notifier));
        let code = lobby.create_room(false).expect("create");
        lobby.join_room(&code, "a".into(), "Alice").expect("join");
        lobby.join_room(&code, "b".into(), "Bob").expect("join");
        (lobby, bus, code)
    }

    fn connection(lobby: &Arc<Lobby>, bus: &Arc<EventBus>, code: &str, id: &str) -> Connection {
        Connection {
            subscription: Some(bus.subscribe(code.to_string(), Some(id.to_string()))),
            player_id: Some(id.to_string()),
            lobby: Arc::clone(lobby),
            event_bus: Arc::clone(bus),
        }
    }

    #[test]
    fn initial_events_include_private_hand() {
        let (lobby, _, code) = setup();
        lobby.start_hand(&code).expect("start");
        let events = initial_events(&lobby, &code, Some("a")).expect("events");
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], TableEvent::StateUpdate { .. }));
        assert!(matches!(&events[1], TableEvent::PrivateHand { player_id, .. } if player_id == "a"));

        let spectator = initial_events(&lobby, &code, None).expect("events");
        assert_eq!(spectator.len(), 1);
    }

    #[test]
    fn unknown_player_cannot_stream() {
        let (lobby, _, code) = setup();
        assert_eq!(
            initial_events(&lobby, &code, Some("ghost")),
            Err(GameError::PlayerNotFound("ghost".into()))
        );
    }

    #[test]
    fn closing_last_stream_disconnects_player() {
        let (lobby, bus, code) = setup();
        let first = connection(&lobby, &bus, &code, "a");
        let second = connection(&lobby, &bus, &code, "a");

        drop(first);
        assert!(lobby.snapshot(&code).expect("snapshot").player("a").is_some());

        drop(second);
        let snapshot = lobby.snapshot(&code).expect("snapshot");
        assert!(snapshot.player("a").is_none());
        assert!(snapshot.player("b").is_some());
    }

    #[test]
    fn event_names_match_wire_tags() {
        let event = TableEvent::Winner {
            name: "a".into(),
            description: "Flush".into(),
            amount: 10,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], event_name(&event));
    }
}
