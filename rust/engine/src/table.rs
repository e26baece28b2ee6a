//! One room's table: seats, deck, pot ledger and the hand state machine.
//!
//! Betting operations live in [`crate::betting`] and settlement in
//! [`crate::showdown`]; this module owns the hand lifecycle (start, street
//! advance, turn passing, seat changes) and the outbound notification queue.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cards::Card;
use crate::deck::Deck;
use crate::errors::{GameError, InvalidAction};
use crate::events::{
    ActionRecord, Audience, HandSummary, Notification, Payout, PlayerView, PotView,
    RoomSnapshot, TableEvent,
};
use crate::hand::HandEvaluator;
use crate::player::{Player, PlayerId};
use crate::pot::{Pot, PotLedger};
use crate::seats::{next_matching, rotation_from};

/// Short code identifying a room.
pub type RoomCode = String;

pub(crate) const RECENT_HANDS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub starting_balance: u32,
    pub small_blind: u32,
    pub big_blind: u32,
    pub max_players: usize,
    /// Players with chips needed before a hand can be dealt
    pub min_players: usize,
}

impl TableConfig {
    /// Chips a full table starts with, or `None` when they overflow a pot.
    pub fn chip_capacity(&self) -> Option<u32> {
        u32::try_from(self.max_players)
            .ok()?
            .checked_mul(self.starting_balance)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1000,
            small_blind: 1,
            big_blind: 2,
            max_players: 4,
            min_players: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No hand dealt yet
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Phase {
    pub fn is_betting(self) -> bool {
        matches!(
            self,
            Phase::Preflop | Phase::Flop | Phase::Turn | Phase::River
        )
    }

    /// The street that follows, or `None` after the river.
    pub(crate) fn next_street(self) -> Option<Phase> {
        match self {
            Phase::Preflop => Some(Phase::Flop),
            Phase::Flop => Some(Phase::Turn),
            Phase::Turn => Some(Phase::River),
            Phase::Waiting | Phase::River | Phase::Showdown => None,
        }
    }

    /// Community cards dealt when entering this street.
    fn board_cards(self) -> usize {
        match self {
            Phase::Flop => 3,
            Phase::Turn | Phase::River => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Waiting => "waiting",
            Phase::Preflop => "preflop",
            Phase::Flop => "flop",
            Phase::Turn => "turn",
            Phase::River => "river",
            Phase::Showdown => "showdown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BettingState {
    pub phase: Phase,
    /// Largest street bet currently on the table
    pub highest_bet: u32,
    /// Smallest legal raise increment
    pub min_raise: u32,
    pub last_raiser: Option<PlayerId>,
    pub community_cards: Vec<Card>,
}

impl BettingState {
    fn waiting(big_blind: u32) -> Self {
        Self {
            phase: Phase::Waiting,
            highest_bet: 0,
            min_raise: big_blind,
            last_raiser: None,
            community_cards: Vec::with_capacity(5),
        }
    }
}

pub struct Table {
    code: RoomCode,
    pub(crate) config: TableConfig,
    pub(crate) physical_deck: bool,
    pub(crate) players: Vec<Player>,
    pub(crate) deck: Deck,
    pub(crate) ledger: PotLedger,
    pub(crate) state: BettingState,
    pub(crate) button: Option<usize>,
    /// Active players who still owe an action this street, in turn order
    pub(crate) to_act: Vec<PlayerId>,
    hand_number: u64,
    pub(crate) history: Vec<ActionRecord>,
    pub(crate) payouts: Vec<Payout>,
    pub(crate) recent_hands: VecDeque<HandSummary>,
    /// Set once hole cards are shown at an automatic showdown
    pub(crate) cards_revealed: bool,
    pub(crate) evaluator: Arc<dyn HandEvaluator>,
    outbox: Vec<Notification>,
    ever_occupied: bool,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("code", &self.code)
            .field("phase", &self.state.phase)
            .field("hand_number", &self.hand_number)
            .field("players", &self.players.len())
            .field("pot_total", &self.ledger.total())
            .finish()
    }
}

impl Table {
    pub fn new(
        code: RoomCode,
        config: TableConfig,
        physical_deck: bool,
        evaluator: Arc<dyn HandEvaluator>,
    ) -> Self {
        let state = BettingState::waiting(config.big_blind);
        Self {
            code,
            config,
            physical_deck,
            players: Vec::new(),
            deck: Deck::new_random(),
            ledger: PotLedger::new(),
            state,
            button: None,
            to_act: Vec::new(),
            hand_number: 0,
            history: Vec::new(),
            payouts: Vec::new(),
            recent_hands: VecDeque::with_capacity(RECENT_HANDS),
            cards_revealed: false,
            evaluator,
            outbox: Vec::new(),
            ever_occupied: false,
        }
    }

    /// Replace the deck with a deterministic one.
    pub fn with_deck_seed(mut self, seed: u64) -> Self {
        self.deck = Deck::new_with_seed(seed);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }
    pub fn config(&self) -> &TableConfig {
        &self.config
    }
    pub fn is_physical_deck(&self) -> bool {
        self.physical_deck
    }
    pub fn players(&self) -> &[Player] {
        &self.players
    }
    pub fn state(&self) -> &BettingState {
        &self.state
    }
    pub fn phase(&self) -> Phase {
        self.state.phase
    }
    pub fn pots(&self) -> &[Pot] {
        self.ledger.pots()
    }
    pub fn hand_number(&self) -> u64 {
        self.hand_number
    }
    pub fn recent_hands(&self) -> impl Iterator<Item = &HandSummary> {
        self.recent_hands.iter()
    }
    pub fn to_act(&self) -> &[PlayerId] {
        &self.to_act
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn seat_of(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn dealer(&self) -> Option<usize> {
        self.players.iter().position(|p| p.is_dealer)
    }

    /// Seat currently holding the turn, if any.
    pub fn current_turn(&self) -> Option<usize> {
        self.players.iter().position(|p| p.is_turn)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Empty now, but has seated somebody before.
    pub fn is_abandoned(&self) -> bool {
        self.ever_occupied && self.players.is_empty()
    }

    /// Balances plus every chip in the pots. Constant within a hand.
    pub fn chips_in_play(&self) -> u64 {
        let balances: u64 = self.players.iter().map(|p| u64::from(p.balance)).sum();
        balances + u64::from(self.ledger.total())
    }

    /// A hand is being bet, or a manual showdown still holds chips.
    pub fn hand_in_progress(&self) -> bool {
        self.state.phase.is_betting()
            || (self.state.phase == Phase::Showdown && self.ledger.total() > 0)
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    pub fn join(&mut self, id: PlayerId, name: &str) -> Result<(), GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InvalidAction::EmptyName.into());
        }
        if self.players.len() >= self.config.max_players {
            return Err(GameError::RoomFull {
                max: self.config.max_players,
            });
        }
        if self.seat_of(&id).is_some() {
            return Err(GameError::AlreadySeated(id));
        }
        if self.players.iter().any(|p| p.matches_name(name)) {
            return Err(GameError::NameTaken(name.to_string()));
        }
        let in_play: u64 = self
            .players
            .iter()
            .map(|p| u64::from(p.balance))
            .sum::<u64>()
            + u64::from(self.ledger.total());
        if in_play + u64::from(self.config.starting_balance) > u64::from(u32::MAX) {
            // pots are counted in u32
            return Err(GameError::RoomFull {
                max: self.players.len(),
            });
        }

        info!(room = %self.code, player_id = %id, name, seat = self.players.len(), "player joined");
        self.players
            .push(Player::new(id, name.to_string(), self.config.starting_balance));
        self.ever_occupied = true;
        self.emit_state();
        Ok(())
    }

    /// Re-send everything a reconnecting player needs to rebuild their view.
    pub fn resync(&mut self, id: &str) -> Result<(), GameError> {
        let player = self
            .player(id)
            .ok_or_else(|| GameError::PlayerNotFound(id.to_string()))?;
        if !player.hand.is_empty() {
            let event = TableEvent::PrivateHand {
                player_id: player.id.clone(),
                cards: player.hand.clone(),
            };
            self.emit(Audience::Player(id.to_string()), event);
        }
        self.emit_state();
        if self.physical_deck && self.hand_in_progress() && !self.state.phase.is_betting() {
            self.request_winner();
        }
        Ok(())
    }

    /// Deal a new hand. `Ok(false)` when fewer than `min_players` have chips.
    pub fn start_hand(&mut self) -> Result<bool, GameError> {
        if self.hand_in_progress() {
            return Err(InvalidAction::HandInProgress.into());
        }
        let eligible = self.players.iter().filter(|p| p.balance > 0).count();
        if eligible < self.config.min_players.max(2) {
            debug!(room = %self.code, eligible, "not enough players with chips to deal");
            return Ok(false);
        }

        for player in &mut self.players {
            player.reset_for_hand();
        }
        let in_hand = |p: &Player| !p.folded;
        let dealer = match self.button {
            None if in_hand(&self.players[0]) => Some(0),
            None => next_matching(&self.players, 0, in_hand),
            Some(previous) => next_matching(&self.players, previous, in_hand),
        };
        let Some(dealer) = dealer else {
            return Ok(false);
        };

        self.hand_number += 1;
        self.state = BettingState::waiting(self.config.big_blind);
        self.state.phase = Phase::Preflop;
        self.to_act.clear();
        self.history.clear();
        self.payouts.clear();
        self.cards_revealed = false;
        self.deck.shuffle();
        self.ledger.open_hand(
            self.players
                .iter()
                .filter(|p| !p.folded)
                .map(|p| p.id.clone()),
        );

        self.button = Some(dealer);
        self.players[dealer].is_dealer = true;
        let (small, big) = if eligible == 2 {
            let big = next_matching(&self.players, dealer, in_hand).unwrap_or(dealer);
            (dealer, big)
        } else {
            let small = next_matching(&self.players, dealer, in_hand).unwrap_or(dealer);
            let big = next_matching(&self.players, small, in_hand).unwrap_or(small);
            (small, big)
        };
        self.players[small].is_small_blind = true;
        self.players[big].is_big_blind = true;

        info!(
            room = %self.code,
            hand = self.hand_number,
            dealer,
            small_blind = small,
            big_blind = big,
            "hand started"
        );

        self.post_blind(small, self.config.small_blind)?;
        self.post_blind(big, self.config.big_blind)?;

        if !self.physical_deck {
            self.deal_hole_cards(dealer);
        }

        let first = if eligible == 2 {
            dealer
        } else {
            next_matching(&self.players, big, in_hand).unwrap_or(big)
        };
        self.open_round(first);
        if self.round_closed() {
            self.close_street();
        } else {
            self.pass_turn_to(first);
        }
        self.emit_state();
        Ok(true)
    }

    fn post_blind(&mut self, seat: usize, blind: u32) -> Result<(), InvalidAction> {
        let amount = blind.min(self.players[seat].balance);
        if amount == 0 {
            return Ok(());
        }
        self.apply_bet(seat, amount)
    }

    fn deal_hole_cards(&mut self, dealer: usize) {
        let start = (dealer + 1) % self.players.len();
        let order = rotation_from(&self.players, start, |p| !p.folded);
        for _ in 0..2 {
            for &seat in &order {
                if let Some(card) = self.deck.deal_card() {
                    self.players[seat].hand.push(card);
                }
            }
        }
        for &seat in &order {
            let id = self.players[seat].id.clone();
            let event = TableEvent::PrivateHand {
                player_id: id.clone(),
                cards: self.players[seat].hand.clone(),
            };
            self.emit(Audience::Player(id), event);
        }
    }

    /// Seed `to_act` with every active player in rotation from `first`.
    pub(crate) fn open_round(&mut self, first: usize) {
        self.to_act = rotation_from(&self.players, first, Player::is_active)
            .into_iter()
            .map(|seat| self.players[seat].id.clone())
            .collect();
        if self.betting_is_over() {
            self.to_act.clear();
        }
    }

    /// Every other active player must act again, starting after `seat`.
    pub(crate) fn reopen_round(&mut self, seat: usize) {
        let start = (seat + 1) % self.players.len();
        let order: Vec<usize> = rotation_from(&self.players, start, Player::is_active)
            .into_iter()
            .filter(|&s| s != seat)
            .collect();
        for &s in &order {
            self.players[s].has_acted = false;
        }
        self.to_act = order
            .into_iter()
            .map(|s| self.players[s].id.clone())
            .collect();
    }

    pub(crate) fn in_hand_count(&self) -> usize {
        self.players.iter().filter(|p| !p.folded).count()
    }

    /// No active player left, or a lone one who owes nothing.
    fn betting_is_over(&self) -> bool {
        let mut active = self.players.iter().filter(|p| p.is_active());
        match (active.next(), active.next()) {
            (None, _) => true,
            (Some(only), None) => only.bet >= self.state.highest_bet,
            _ => false,
        }
    }

    fn round_closed(&self) -> bool {
        self.to_act.is_empty() || self.betting_is_over()
    }

    /// Move the hand forward after `from` acted or left.
    pub(crate) fn progress(&mut self, from: usize) {
        if self.in_hand_count() <= 1 {
            self.award_uncontested();
        } else if self.round_closed() {
            self.close_street();
        } else {
            self.pass_turn_after(from);
        }
    }

    fn clear_turn(&mut self) {
        for player in &mut self.players {
            player.is_turn = false;
        }
    }

    fn pass_turn_to(&mut self, seat: usize) {
        self.clear_turn();
        let owes = self
            .players
            .get(seat)
            .is_some_and(|p| p.is_active() && self.to_act.contains(&p.id));
        if owes {
            self.players[seat].is_turn = true;
        } else {
            self.pass_turn_after(seat);
        }
    }

    fn pass_turn_after(&mut self, from: usize) {
        self.clear_turn();
        let to_act = &self.to_act;
        let next = next_matching(&self.players, from, |p| {
            p.is_active() && to_act.contains(&p.id)
        });
        if let Some(seat) = next {
            debug!(room = %self.code, seat, player_id = %self.players[seat].id, "turn passed");
            self.players[seat].is_turn = true;
        }
    }

    /// Finish the street and deal the next one, running the board out when
    /// nobody can bet any more.
    fn close_street(&mut self) {
        loop {
            self.clear_turn();
            self.to_act.clear();
            for player in &mut self.players {
                player.reset_for_street();
            }
            self.state.highest_bet = 0;
            self.state.min_raise = self.config.big_blind;
            self.state.last_raiser = None;

            let Some(next) = self.state.phase.next_street() else {
                self.enter_showdown();
                return;
            };
            self.deal_street(next);
            self.state.phase = next;
            info!(
                room = %self.code,
                hand = self.hand_number,
                phase = %next,
                board = ?self.state.community_cards,
                "street dealt"
            );

            let dealer = self.button.unwrap_or(0);
            let first = next_matching(&self.players, dealer, Player::is_active);
            if let Some(first) = first {
                self.open_round(first);
                if !self.to_act.is_empty() {
                    self.pass_turn_to(first);
                    return;
                }
            }
        }
    }

    fn deal_street(&mut self, street: Phase) {
        if self.physical_deck {
            return;
        }
        self.deck.burn_card();
        for _ in 0..street.board_cards() {
            if let Some(card) = self.deck.deal_card() {
                self.state.community_cards.push(card);
            }
        }
    }

    /// Remove a seat. A player in the hand forfeits their stake; the turn
    /// moves on if it was theirs.
    pub fn remove_player(&mut self, id: &str) -> Result<(), GameError> {
        let seat = self
            .seat_of(id)
            .ok_or_else(|| GameError::PlayerNotFound(id.to_string()))?;
        let in_hand = self.hand_in_progress() && !self.players[seat].folded;
        let was_turn = self.players[seat].is_turn;

        if in_hand {
            self.ledger.forfeit(id);
        }
        self.to_act.retain(|p| p != id);
        let removed = self.players.remove(seat);
        info!(
            room = %self.code,
            player_id = %removed.id,
            name = %removed.name,
            seat,
            forfeited = removed.whole_hand_bet,
            "player left"
        );

        let remaining = self.players.len();
        self.button = match self.button {
            _ if remaining == 0 => None,
            Some(b) if seat < b => Some(b - 1),
            Some(b) if seat == b => Some((b + remaining - 1) % remaining),
            other => other,
        };

        if remaining == 0 {
            self.abandon_hand();
            return Ok(());
        }

        if self.state.phase.is_betting() && in_hand {
            if self.in_hand_count() == 0 {
                self.abandon_hand();
            } else if was_turn || self.round_closed() || self.in_hand_count() == 1 {
                self.progress((seat + remaining - 1) % remaining);
            }
        } else if self.state.phase == Phase::Showdown && self.ledger.total() > 0 {
            match self.in_hand_count() {
                0 => self.abandon_hand(),
                1 => self.award_uncontested(),
                _ if self.physical_deck => self.request_winner(),
                _ => {}
            }
        }
        self.emit_state();
        Ok(())
    }

    /// Everyone who could win the pots is gone; the chips leave with them.
    fn abandon_hand(&mut self) {
        if self.ledger.total() > 0 {
            warn!(room = %self.code, hand = self.hand_number, chips = self.ledger.total(), "hand abandoned with chips in the pot");
        }
        self.ledger.clear();
        self.to_act.clear();
        self.clear_turn();
        if self.state.phase.is_betting() {
            self.state.phase = Phase::Showdown;
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let reveal = self.cards_revealed && self.state.phase == Phase::Showdown;
        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(seat, p)| PlayerView {
                seat,
                id: p.id.clone(),
                name: p.name.clone(),
                balance: p.balance,
                bet: p.bet,
                whole_hand_bet: p.whole_hand_bet,
                card_count: p.hand.len(),
                revealed: (reveal && !p.folded).then(|| p.hand.clone()),
                folded: p.folded,
                all_in: p.all_in,
                has_acted: p.has_acted,
                is_dealer: p.is_dealer,
                is_small_blind: p.is_small_blind,
                is_big_blind: p.is_big_blind,
                is_turn: p.is_turn,
            })
            .collect();
        RoomSnapshot {
            code: self.code.clone(),
            physical_deck: self.physical_deck,
            hand_number: self.hand_number,
            phase: self.state.phase,
            highest_bet: self.state.highest_bet,
            min_raise: self.state.min_raise,
            last_raiser: self
                .state
                .last_raiser
                .as_deref()
                .and_then(|id| self.seat_of(id)),
            community_cards: self.state.community_cards.clone(),
            pots: self
                .ledger
                .pots()
                .iter()
                .map(|pot| PotView {
                    amount: pot.amount,
                    contenders: pot
                        .contenders
                        .iter()
                        .filter_map(|id| self.seat_of(id))
                        .collect(),
                })
                .collect(),
            players,
        }
    }

    pub(crate) fn emit(&mut self, audience: Audience, event: TableEvent) {
        self.outbox.push(Notification { audience, event });
    }

    pub(crate) fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        self.emit(Audience::Room, TableEvent::StateUpdate { snapshot });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::StandardEvaluator;

    fn table(players: &[&str]) -> Table {
        let mut t = Table::new(
            "TEST1".into(),
            TableConfig::default(),
            false,
            Arc::new(StandardEvaluator),
        )
        .with_deck_seed(3);
        for name in players {
            t.join(format!("id-{name}"), name).expect("join");
        }
        t
    }

    #[test]
    fn join_rejects_blank_duplicate_and_overflow() {
        let mut t = table(&["alice", "bob", "carol", "dave"]);
        assert_eq!(
            t.join("x".into(), "eve"),
            Err(GameError::RoomFull { max: 4 })
        );
        let mut t = table(&["alice"]);
        assert_eq!(
            t.join("x".into(), "ALICE"),
            Err(GameError::NameTaken("ALICE".into()))
        );
        assert_eq!(
            t.join("x".into(), "   "),
            Err(GameError::InvalidAction(InvalidAction::EmptyName))
        );
        assert_eq!(
            t.join("id-alice".into(), "zed"),
            Err(GameError::AlreadySeated("id-alice".into()))
        );
    }

    #[test]
    fn join_refuses_chips_a_pot_cannot_count() {
        let config = TableConfig {
            starting_balance: 2_000_000_000,
            ..TableConfig::default()
        };
        assert_eq!(config.chip_capacity(), None);
        assert_eq!(TableConfig::default().chip_capacity(), Some(4000));

        let mut t = Table::new("BIG01".into(), config, false, Arc::new(StandardEvaluator));
        t.join("a".into(), "a").expect("join");
        t.join("b".into(), "b").expect("join");
        assert_eq!(t.join("c".into(), "c"), Err(GameError::RoomFull { max: 2 }));
    }

    #[test]
    fn single_player_cannot_start() {
        let mut t = table(&["alice"]);
        assert_eq!(t.start_hand(), Ok(false));
        assert_eq!(t.phase(), Phase::Waiting);
    }

    #[test]
    fn start_hand_twice_is_rejected() {
        let mut t = table(&["alice", "bob"]);
        assert_eq!(t.start_hand(), Ok(true));
        assert_eq!(
            t.start_hand(),
            Err(GameError::InvalidAction(InvalidAction::HandInProgress))
        );
    }

    #[test]
    fn three_handed_blinds_follow_the_button() {
        let mut t = table(&["alice", "bob", "carol"]);
        t.start_hand().expect("start");
        let p = t.players();
        assert!(p[0].is_dealer());
        assert!(p[1].is_small_blind());
        assert!(p[2].is_big_blind());
        assert!(p[0].is_turn());
        assert_eq!(t.to_act().len(), 3);
    }

    #[test]
    fn hole_cards_are_private() {
        let mut t = table(&["alice", "bob"]);
        t.take_notifications();
        t.start_hand().expect("start");
        let private: Vec<_> = t
            .take_notifications()
            .into_iter()
            .filter(|n| matches!(n.event, TableEvent::PrivateHand { .. }))
            .collect();
        assert_eq!(private.len(), 2);
        assert!(private
            .iter()
            .all(|n| matches!(&n.audience, Audience::Player(_))));
        let snap = t.snapshot();
        assert!(snap.players.iter().all(|p| p.revealed.is_none()));
        assert!(snap.players.iter().all(|p| p.card_count == 2));
    }

    #[test]
    fn late_joiner_sits_out_current_hand() {
        let mut t = table(&["alice", "bob"]);
        t.start_hand().expect("start");
        t.join("id-carol".into(), "carol").expect("join");
        let carol = t.player("id-carol").expect("carol");
        assert!(carol.is_folded());
        assert!(carol.hand().is_empty());
        assert!(!t.to_act().iter().any(|id| id == "id-carol"));
    }
}
