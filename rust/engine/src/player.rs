use crate::cards::Card;
use crate::errors::InvalidAction;
use serde::{Deserialize, Serialize};

/// Connection-scoped identity of a participant, supplied by the transport.
pub type PlayerId = String;

/// The kinds of move a player can make on their turn.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CheckOrCall,
    Raise,
    Fold,
    AllIn,
}

/// A player action during a betting round.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum Action {
    /// Check when nothing is owed, otherwise call the outstanding amount
    CheckOrCall,
    /// Call, then raise by the given amount on top
    Raise(u32),
    /// Give up the hand
    Fold,
    /// Bet every remaining chip
    AllIn,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CheckOrCall => ActionKind::CheckOrCall,
            Action::Raise(_) => ActionKind::Raise,
            Action::Fold => ActionKind::Fold,
            Action::AllIn => ActionKind::AllIn,
        }
    }
}

/// Wire form of an action: `{ "kind": "raise", "amount": 10 }`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u32>,
}

impl ActionRequest {
    pub fn into_action(self) -> Result<Action, InvalidAction> {
        match self.kind {
            ActionKind::CheckOrCall => Ok(Action::CheckOrCall),
            ActionKind::Fold => Ok(Action::Fold),
            ActionKind::AllIn => Ok(Action::AllIn),
            ActionKind::Raise => match self.amount {
                None => Err(InvalidAction::MissingAmount),
                Some(0) => Err(InvalidAction::NonPositiveAmount),
                Some(amount) => Ok(Action::Raise(amount)),
            },
        }
    }
}

/// A seated participant. Balance survives across hands; everything else is
/// reset by [`Player::reset_for_hand`].
#[derive(Debug, Clone)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    /// Chips not currently wagered
    pub(crate) balance: u32,
    /// Wagered on the current street
    pub(crate) bet: u32,
    /// Wagered across the whole hand
    pub(crate) whole_hand_bet: u32,
    pub(crate) hand: Vec<Card>,
    pub(crate) folded: bool,
    pub(crate) all_in: bool,
    pub(crate) has_acted: bool,
    pub(crate) is_dealer: bool,
    pub(crate) is_small_blind: bool,
    pub(crate) is_big_blind: bool,
    pub(crate) is_turn: bool,
}

impl Player {
    /// A player who joins sits out until the next hand is dealt.
    pub fn new(id: PlayerId, name: String, balance: u32) -> Self {
        Self {
            id,
            name,
            balance,
            bet: 0,
            whole_hand_bet: 0,
            hand: Vec::with_capacity(2),
            folded: true,
            all_in: false,
            has_acted: false,
            is_dealer: false,
            is_small_blind: false,
            is_big_blind: false,
            is_turn: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn balance(&self) -> u32 {
        self.balance
    }
    pub fn bet(&self) -> u32 {
        self.bet
    }
    pub fn whole_hand_bet(&self) -> u32 {
        self.whole_hand_bet
    }
    pub fn hand(&self) -> &[Card] {
        &self.hand
    }
    pub fn is_folded(&self) -> bool {
        self.folded
    }
    pub fn is_all_in(&self) -> bool {
        self.all_in
    }
    pub fn has_acted(&self) -> bool {
        self.has_acted
    }
    pub fn is_dealer(&self) -> bool {
        self.is_dealer
    }
    pub fn is_small_blind(&self) -> bool {
        self.is_small_blind
    }
    pub fn is_big_blind(&self) -> bool {
        self.is_big_blind
    }
    pub fn is_turn(&self) -> bool {
        self.is_turn
    }

    /// Still able to act: neither folded nor all-in.
    pub fn is_active(&self) -> bool {
        !self.folded && !self.all_in
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Clear role flags and hand state. Players without chips sit the hand out.
    pub(crate) fn reset_for_hand(&mut self) {
        self.bet = 0;
        self.whole_hand_bet = 0;
        self.hand.clear();
        self.folded = self.balance == 0;
        self.all_in = false;
        self.has_acted = false;
        self.is_dealer = false;
        self.is_small_blind = false;
        self.is_big_blind = false;
        self.is_turn = false;
    }

    pub(crate) fn reset_for_street(&mut self) {
        self.bet = 0;
        self.has_acted = false;
    }

    /// Move chips from the balance into this street's wager.
    pub(crate) fn wager(&mut self, amount: u32) -> Result<(), InvalidAction> {
        if amount == 0 {
            return Err(InvalidAction::NonPositiveAmount);
        }
        if self.folded {
            return Err(InvalidAction::PlayerFolded);
        }
        if amount > self.balance {
            return Err(InvalidAction::InsufficientBalance);
        }
        self.balance -= amount;
        self.bet += amount;
        self.whole_hand_bet += amount;
        if self.balance == 0 {
            self.all_in = true;
        }
        Ok(())
    }

    pub(crate) fn credit(&mut self, amount: u32) {
        self.balance = self.balance.saturating_add(amount);
    }
}
