//! Outbound notifications. The table queues them while it mutates; the
//! lobby hands them to a [`Notifier`] once the operation is complete.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::cards::Card;
use crate::player::{Action, PlayerId};
use crate::table::{Phase, RoomCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableEvent {
    /// Hole cards, sent to their owner only
    PrivateHand {
        player_id: PlayerId,
        cards: Vec<Card>,
    },
    StateUpdate {
        snapshot: RoomSnapshot,
    },
    ActionTaken {
        seat: usize,
        name: String,
        action: Action,
    },
    Winner {
        name: String,
        description: String,
        amount: u32,
    },
    /// Physical-deck mode: the dealer must pick the winners of this pot
    ChooseWinnerRequest {
        pot_index: usize,
        pot_amount: u32,
        /// Seat indices eligible for this pot
        contenders: Vec<usize>,
    },
    HandCompleted {
        summary: HandSummary,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", content = "player_id", rename_all = "snake_case")]
pub enum Audience {
    Room,
    Player(PlayerId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub audience: Audience,
    pub event: TableEvent,
}

/// Delivery of table events to room members. Fire-and-forget: failures
/// are the transport's concern.
pub trait Notifier: Send + Sync {
    fn deliver(&self, room: &str, notification: Notification);
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn deliver(&self, _room: &str, _notification: Notification) {}
}

/// Keeps every delivered notification in memory, for tests and replay.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    delivered: Arc<Mutex<Vec<(RoomCode, Notification)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<(RoomCode, Notification)> {
        match self.delivered.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn events_for(&self, room: &str, audience: &Audience) -> Vec<TableEvent> {
        self.delivered()
            .into_iter()
            .filter(|(code, n)| code == room && &n.audience == audience)
            .map(|(_, n)| n.event)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.delivered.lock() {
            guard.clear();
        }
    }
}

impl Notifier for RecordingNotifier {
    fn deliver(&self, room: &str, notification: Notification) {
        if let Ok(mut guard) = self.delivered.lock() {
            guard.push((room.to_string(), notification));
        }
    }
}

/// Public view of one seat. Private cards only appear once revealed at
/// showdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub seat: usize,
    /// Authorizes actions for this seat, so it never leaves the process
    #[serde(skip)]
    pub id: PlayerId,
    pub name: String,
    pub balance: u32,
    pub bet: u32,
    pub whole_hand_bet: u32,
    pub card_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed: Option<Vec<Card>>,
    pub folded: bool,
    pub all_in: bool,
    pub has_acted: bool,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub is_turn: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub physical_deck: bool,
    pub hand_number: u64,
    pub phase: Phase,
    pub highest_bet: u32,
    pub min_raise: u32,
    /// Seat of the last player to raise this street
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_raiser: Option<usize>,
    pub community_cards: Vec<Card>,
    pub pots: Vec<PotView>,
    pub players: Vec<PlayerView>,
}

/// A pot as the room sees it: contenders are seat indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotView {
    pub amount: u32,
    pub contenders: Vec<usize>,
}

impl RoomSnapshot {
    pub fn player(&self, id: &str) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn pot_total(&self) -> u32 {
        self.pots.iter().map(|p| p.amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    #[serde(skip)]
    pub player_id: PlayerId,
    pub name: String,
    pub amount: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(skip)]
    pub player_id: PlayerId,
    pub name: String,
    pub phase: Phase,
    pub action: Action,
}

/// Outcome of one settled hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandSummary {
    pub hand_number: u64,
    pub board: Vec<Card>,
    pub actions: Vec<ActionRecord>,
    pub payouts: Vec<Payout>,
    /// RFC3339 timestamp of settlement
    pub finished_at: String,
}
