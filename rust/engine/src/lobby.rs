//! Room registry. Owns every table and routes operations to them.
//!
//! The map lock is held only long enough to find a room. Each operation
//! then runs under that room's mutex and delivers the room's notifications
//! before releasing it, so listeners see events in state order.

use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::errors::GameError;
use crate::events::{Notifier, NullNotifier, RoomSnapshot};
use crate::hand::{HandEvaluator, StandardEvaluator};
use crate::player::{Action, PlayerId};
use crate::table::{RoomCode, Table, TableConfig};

const CODE_LEN: usize = 5;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub struct Lobby {
    rooms: RwLock<HashMap<RoomCode, Arc<Mutex<Table>>>>,
    config: TableConfig,
    notifier: Arc<dyn Notifier>,
    evaluator: Arc<dyn HandEvaluator>,
    deck_seed: Option<u64>,
}

impl std::fmt::Debug for Lobby {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rooms = self.rooms.read().map(|r| r.len()).unwrap_or(0);
        f.debug_struct("Lobby")
            .field("rooms", &rooms)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new(TableConfig::default(), Arc::new(NullNotifier))
    }
}

impl Lobby {
    pub fn new(config: TableConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
            notifier,
            evaluator: Arc::new(StandardEvaluator),
            deck_seed: None,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn HandEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Deterministic decks for every room created from here on.
    pub fn with_deck_seed(mut self, seed: u64) -> Self {
        self.deck_seed = Some(seed);
        self
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn create_room(&self, physical_deck: bool) -> Result<RoomCode, GameError> {
        self.sweep()?;
        let mut rooms = self
            .rooms
            .write()
            .map_err(|_| GameError::StoragePoisoned)?;
        let code = loop {
            let candidate = generate_room_code();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let mut table = Table::new(
            code.clone(),
            self.config.clone(),
            physical_deck,
            Arc::clone(&self.evaluator),
        );
        if let Some(seed) = self.deck_seed {
            table = table.with_deck_seed(seed.wrapping_add(rooms.len() as u64));
        }
        rooms.insert(code.clone(), Arc::new(Mutex::new(table)));
        info!(room = %code, physical_deck, "room created");
        Ok(code)
    }

    fn room(&self, code: &str) -> Result<Arc<Mutex<Table>>, GameError> {
        let rooms = self
            .rooms
            .read()
            .map_err(|_| GameError::StoragePoisoned)?;
        rooms
            .get(code)
            .cloned()
            .ok_or_else(|| GameError::GameNotFound(code.to_string()))
    }

    /// Run `op` on a room under its lock, then flush its notifications.
    fn with_room<T>(
        &self,
        code: &str,
        op: impl FnOnce(&mut Table) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let room = self.room(code)?;
        let mut table = lock(&room)?;
        let result = op(&mut table);
        self.flush(&mut table);
        result
    }

    fn flush(&self, table: &mut MutexGuard<'_, Table>) {
        let code = table.code().to_string();
        for notification in table.take_notifications() {
            self.notifier.deliver(&code, notification);
        }
    }

    pub fn join_room(&self, code: &str, player_id: PlayerId, name: &str) -> Result<(), GameError> {
        self.with_room(code, |table| table.join(player_id, name))
    }

    /// A returning client: re-send the snapshot and their private hand.
    pub fn rejoin_room(&self, code: &str, player_id: &str) -> Result<(), GameError> {
        self.sweep()?;
        self.with_room(code, |table| table.resync(player_id))
    }

    pub fn start_hand(&self, code: &str) -> Result<bool, GameError> {
        self.with_room(code, Table::start_hand)
    }

    pub fn act(&self, code: &str, player_id: &str, action: Action) -> Result<(), GameError> {
        self.with_room(code, |table| table.act(player_id, action))
    }

    pub fn choose_winners(&self, code: &str, seats: &[usize], amount: u32) -> Result<(), GameError> {
        self.with_room(code, |table| table.choose_winners(seats, amount))
    }

    pub fn remove_player(&self, code: &str, player_id: &str) -> Result<(), GameError> {
        self.with_room(code, |table| table.remove_player(player_id))
    }

    /// Drop `player_id` from every room they sit in. Returns the rooms left.
    pub fn disconnect(&self, player_id: &str) -> Result<Vec<RoomCode>, GameError> {
        let rooms: Vec<(RoomCode, Arc<Mutex<Table>>)> = {
            let guard = self
                .rooms
                .read()
                .map_err(|_| GameError::StoragePoisoned)?;
            guard
                .iter()
                .map(|(code, room)| (code.clone(), Arc::clone(room)))
                .collect()
        };

        let mut left = Vec::new();
        for (code, room) in rooms {
            let Ok(mut table) = room.lock() else {
                warn!(room = %code, player_id, "skipping poisoned room");
                continue;
            };
            if table.seat_of(player_id).is_none() {
                continue;
            }
            table.remove_player(player_id)?;
            self.flush(&mut table);
            left.push(code);
        }
        debug!(player_id, rooms = ?left, "player disconnected");
        Ok(left)
    }

    pub fn snapshot(&self, code: &str) -> Result<RoomSnapshot, GameError> {
        let room = self.room(code)?;
        let table = lock(&room)?;
        Ok(table.snapshot())
    }

    /// Read access to a room's table for callers that need more than the
    /// snapshot.
    pub fn inspect<T>(&self, code: &str, f: impl FnOnce(&Table) -> T) -> Result<T, GameError> {
        let room = self.room(code)?;
        let table = lock(&room)?;
        Ok(f(&table))
    }

    pub fn rooms(&self) -> Result<Vec<RoomCode>, GameError> {
        let rooms = self
            .rooms
            .read()
            .map_err(|_| GameError::StoragePoisoned)?;
        let mut codes: Vec<RoomCode> = rooms.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    /// Drop rooms that held players once and are now empty. Rooms that
    /// never had anyone seated are kept, and so are poisoned ones: their
    /// own operations keep failing without touching other rooms.
    pub fn sweep(&self) -> Result<usize, GameError> {
        let mut rooms = self
            .rooms
            .write()
            .map_err(|_| GameError::StoragePoisoned)?;
        let before = rooms.len();
        rooms.retain(|code, room| match room.lock() {
            Ok(table) if table.is_abandoned() => {
                info!(room = %code, "removing empty room");
                false
            }
            Ok(_) => true,
            Err(_) => {
                warn!(room = %code, "room lock poisoned");
                true
            }
        });
        Ok(before - rooms.len())
    }
}

fn lock(room: &Mutex<Table>) -> Result<MutexGuard<'_, Table>, GameError> {
    room.lock().map_err(|_| GameError::StoragePoisoned)
}
