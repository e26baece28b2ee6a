//! HTTP and Server-Sent-Events front end for `holdem-engine`.
//!
//! Rooms live in a [`holdem_engine::lobby::Lobby`]; every table event is
//! routed through the [`EventBus`], which fans room-wide events out to all
//! open streams of a room and private hands to their owner only.

pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod settings;

pub use errors::{handle_rejection, ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use events::{EventBus, EventSubscription};
pub use logging::{init_logging, init_test_logging, LogEntry, TestLogSubscriber};
pub use middleware::with_request_logging;
pub use server::{routes, AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use settings::{AppSettings, SettingsError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_provides_shared_components() {
        let ctx = AppContext::new_for_tests();

        assert_eq!(ctx.event_bus().subscriber_count(), 0);
        assert!(ctx.lobby().rooms().expect("rooms").is_empty());
        assert_eq!(ctx.config().port(), 0);
    }
}
