//! Player actions during a betting round.

use tracing::debug;

use crate::errors::{GameError, InvalidAction};
use crate::events::{ActionRecord, Audience, TableEvent};
use crate::player::Action;
use crate::rules::{validate_action, ValidatedAction};
use crate::table::Table;

impl Table {
    /// Perform `action` for the player holding the turn.
    ///
    /// Validation happens before anything is touched: on error the table is
    /// unchanged.
    pub fn act(&mut self, player_id: &str, action: Action) -> Result<(), GameError> {
        let seat = self
            .seat_of(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        let player = &self.players[seat];
        if !player.is_turn || !self.state.phase.is_betting() {
            return Err(GameError::NotYourTurn);
        }
        let to_call = self.state.highest_bet.saturating_sub(player.bet);
        let validated = validate_action(player.balance, to_call, self.state.min_raise, action)?;

        debug!(
            room = %self.code(),
            player_id,
            phase = %self.state.phase,
            ?validated,
            "applying action"
        );
        match validated {
            ValidatedAction::Fold => self.fold(seat),
            ValidatedAction::Check => {}
            ValidatedAction::Call(amount) => self.apply_bet(seat, amount)?,
            ValidatedAction::Raise { raise, .. } => self.raise(seat, raise)?,
            ValidatedAction::AllIn(_) => self.all_in(seat)?,
        }

        self.players[seat].has_acted = true;
        self.to_act.retain(|id| id != player_id);
        let name = self.players[seat].name.clone();
        self.history.push(ActionRecord {
            player_id: player_id.to_string(),
            name: name.clone(),
            phase: self.state.phase,
            action,
        });
        self.emit(Audience::Room, TableEvent::ActionTaken { seat, name, action });

        self.progress(seat);
        self.emit_state();
        Ok(())
    }

    /// Move `amount` from the player's balance into the pots.
    pub(crate) fn apply_bet(&mut self, seat: usize, amount: u32) -> Result<(), InvalidAction> {
        let player = &mut self.players[seat];
        player.wager(amount)?;
        let bet = player.bet;
        let all_in = player.all_in;
        self.ledger.commit(&player.id, amount, all_in);
        self.state.highest_bet = self.state.highest_bet.max(bet);
        Ok(())
    }

    /// Call the outstanding amount and raise by `raise_amount` on top.
    pub(crate) fn raise(&mut self, seat: usize, raise_amount: u32) -> Result<(), InvalidAction> {
        let player = &self.players[seat];
        let to_call = self.state.highest_bet.saturating_sub(player.bet);
        let total = to_call
            .checked_add(raise_amount)
            .ok_or(InvalidAction::InsufficientBalance)?;
        if total > player.balance {
            return Err(InvalidAction::InsufficientBalance);
        }
        if total == player.balance {
            return self.all_in(seat);
        }
        if raise_amount < self.state.min_raise {
            return Err(InvalidAction::BelowMinimumRaise {
                amount: raise_amount,
                minimum: self.state.min_raise,
            });
        }

        self.apply_bet(seat, total)?;
        self.state.min_raise = raise_amount;
        self.state.last_raiser = Some(self.players[seat].id.clone());
        self.reopen_round(seat);
        Ok(())
    }

    /// Bet the whole balance. Lifting the highest bet reopens the action;
    /// only a full raise moves the minimum raise.
    pub(crate) fn all_in(&mut self, seat: usize) -> Result<(), InvalidAction> {
        let balance = self.players[seat].balance;
        if balance == 0 {
            return Err(InvalidAction::NoChips);
        }
        let before = self.state.highest_bet;
        self.apply_bet(seat, balance)?;

        let bet = self.players[seat].bet;
        if bet > before {
            let increment = bet - before;
            if increment >= self.state.min_raise {
                self.state.min_raise = increment;
            }
            self.state.last_raiser = Some(self.players[seat].id.clone());
            self.reopen_round(seat);
        }
        Ok(())
    }

    pub(crate) fn fold(&mut self, seat: usize) {
        let player = &mut self.players[seat];
        player.folded = true;
        self.ledger.forfeit(&player.id);
    }
}
