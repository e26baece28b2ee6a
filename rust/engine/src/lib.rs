//! # holdem-engine: Multiplayer Texas Hold'em Tables
//!
//! Rooms of up to four players playing no-limit Hold'em with blinds, side
//! pots and showdown settlement. The engine is transport-agnostic: every
//! state change is queued as a [`events::Notification`] and handed to a
//! [`events::Notifier`] supplied by the host.
//!
//! ## Core Modules
//!
//! - [`cards`] - Card representation (Suit, Rank, Card)
//! - [`deck`] - Seedable ChaCha20 deck with burn support
//! - [`player`] - Seat state, actions and the wire action request
//! - [`seats`] - Rotation helpers (next active seat, turn order)
//! - [`rules`] - Action validation against balance and betting state
//! - [`pot`] - Pot ledger: stakes, main pot and side pots
//! - [`table`] - Hand lifecycle: blinds, streets, turn passing
//! - [`betting`] - Check/call, raise, all-in and fold
//! - [`showdown`] - Automatic and dealer-chosen settlement
//! - [`hand`] - Hand evaluation behind the [`hand::HandEvaluator`] trait
//! - [`events`] - Outbound events and public snapshots
//! - [`lobby`] - Room registry and lifecycle
//! - [`errors`] - Error types for room operations
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use holdem_engine::events::RecordingNotifier;
//! use holdem_engine::lobby::Lobby;
//! use holdem_engine::player::Action;
//! use holdem_engine::table::{Phase, TableConfig};
//!
//! let notifier = RecordingNotifier::new();
//! let lobby = Lobby::new(TableConfig::default(), Arc::new(notifier.clone()));
//!
//! let code = lobby.create_room(false).unwrap();
//! lobby.join_room(&code, "p1".into(), "Alice").unwrap();
//! lobby.join_room(&code, "p2".into(), "Bob").unwrap();
//! assert!(lobby.start_hand(&code).unwrap());
//!
//! // Heads-up: the dealer posts the small blind and acts first
//! lobby.act(&code, "p1", Action::Fold).unwrap();
//! let snapshot = lobby.snapshot(&code).unwrap();
//! assert_eq!(snapshot.phase, Phase::Showdown);
//! assert_eq!(snapshot.player("p2").unwrap().balance, 1001);
//! ```

pub mod betting;
pub mod cards;
pub mod deck;
pub mod errors;
pub mod events;
pub mod hand;
pub mod lobby;
pub mod player;
pub mod pot;
pub mod rules;
pub mod seats;
pub mod showdown;
pub mod table;
