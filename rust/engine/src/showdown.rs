//! Settlement: uncontested wins, automatic showdowns through the hand
//! evaluator, and dealer-chosen winners for physical decks.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::errors::{GameError, InvalidAction};
use crate::events::{Audience, HandSummary, Payout, TableEvent};
use crate::seats::rotation_from;
use crate::table::{Phase, Table, RECENT_HANDS};

/// Split `amount` between `winners` shares. Everyone gets `amount / winners`;
/// the remainder goes one chip at a time to the leading shares.
pub fn split_pot(amount: u32, winners: usize) -> Vec<u32> {
    if winners == 0 {
        return Vec::new();
    }
    let n = winners as u32;
    let base = amount / n;
    let remainder = (amount % n) as usize;
    (0..winners)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

impl Table {
    /// Seats ordered for odd-chip distribution: left of the dealer first.
    fn payout_order(&self, seats: &[usize]) -> Vec<usize> {
        if self.players.is_empty() {
            return Vec::new();
        }
        let start = (self.button.unwrap_or(0) + 1) % self.players.len();
        rotation_from(&self.players, start, |_| true)
            .into_iter()
            .filter(|s| seats.contains(s))
            .collect()
    }

    /// Pay `amount` from pot `index` to `winners`, split evenly.
    fn pay_out(
        &mut self,
        index: usize,
        amount: u32,
        winners: &[usize],
        describe: impl Fn(&Table, usize) -> String,
    ) -> Result<(), InvalidAction> {
        let ordered = self.payout_order(winners);
        self.ledger.debit(index, amount)?;
        for (seat, share) in ordered.into_iter().zip(split_pot(amount, winners.len())) {
            if share == 0 {
                continue;
            }
            let description = describe(self, seat);
            self.players[seat].credit(share);
            let player = &self.players[seat];
            info!(
                room = %self.code(),
                pot = index,
                player_id = %player.id,
                amount = share,
                %description,
                "pot awarded"
            );
            let payout = Payout {
                player_id: player.id.clone(),
                name: player.name.clone(),
                amount: share,
                description: description.clone(),
            };
            let event = TableEvent::Winner {
                name: payout.name.clone(),
                description,
                amount: share,
            };
            self.payouts.push(payout);
            self.emit(Audience::Room, event);
        }
        Ok(())
    }

    /// Everybody else folded: the last player standing takes every pot.
    pub(crate) fn award_uncontested(&mut self) {
        self.state.phase = Phase::Showdown;
        self.to_act.clear();
        for player in &mut self.players {
            player.is_turn = false;
        }
        self.return_uncalled();
        self.ledger.freeze();

        let Some(seat) = self.players.iter().position(|p| !p.folded) else {
            return;
        };
        for index in 0..self.ledger.pots().len() {
            let amount = self.ledger.pots()[index].amount;
            if amount == 0 {
                continue;
            }
            if let Err(err) = self.pay_out(index, amount, &[seat], |_, _| {
                "Everyone else folded".to_string()
            }) {
                warn!(room = %self.code(), pot = index, error = %err, "uncontested payout failed");
            }
        }
        self.finish_hand();
    }

    /// Hand chips nobody called back to their owner before settling.
    fn return_uncalled(&mut self) {
        let Some((id, amount)) = self.ledger.refund_uncalled() else {
            return;
        };
        let Some(seat) = self.seat_of(&id) else {
            warn!(room = %self.code(), player_id = %id, amount, "uncalled chips have no owner");
            return;
        };
        debug!(room = %self.code(), player_id = %id, amount, "uncalled chips returned");
        let player = &mut self.players[seat];
        player.credit(amount);
        player.whole_hand_bet = player.whole_hand_bet.saturating_sub(amount);
    }

    /// Betting is over for good: settle automatically, or ask the dealer.
    pub(crate) fn enter_showdown(&mut self) {
        self.state.phase = Phase::Showdown;
        self.to_act.clear();
        for player in &mut self.players {
            player.is_turn = false;
        }
        self.return_uncalled();
        self.ledger.freeze();
        info!(room = %self.code(), hand = self.hand_number(), pots = self.ledger.pots().len(), "showdown");

        if self.in_hand_count() <= 1 {
            self.award_uncontested();
            return;
        }
        if self.physical_deck {
            if self.ledger.next_unsettled().is_some() {
                self.request_winner();
            } else {
                self.finish_hand();
            }
            return;
        }

        self.complete_board();
        self.cards_revealed = true;
        let hands: Vec<_> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.folded)
            .map(|(seat, p)| {
                let mut cards = p.hand.clone();
                cards.extend_from_slice(&self.state.community_cards);
                (seat, self.evaluator.evaluate(&cards))
            })
            .collect();

        for index in 0..self.ledger.pots().len() {
            let pot = self.ledger.pots()[index].clone();
            if pot.amount == 0 {
                continue;
            }
            let contenders: Vec<_> = hands
                .iter()
                .filter(|(seat, _)| pot.is_contender(&self.players[*seat].id))
                .collect();
            let ranked: Vec<_> = contenders.iter().map(|(_, h)| h.clone()).collect();
            let winners: Vec<usize> = self
                .evaluator
                .rank_winners(&ranked)
                .into_iter()
                .map(|i| contenders[i].0)
                .collect();
            if winners.is_empty() {
                warn!(room = %self.code(), pot = index, chips = pot.amount, "pot has no contenders");
                continue;
            }
            let paid = self.pay_out(index, pot.amount, &winners, |_, seat| {
                hands
                    .iter()
                    .find(|(s, _)| *s == seat)
                    .map(|(_, h)| h.describe())
                    .unwrap_or_default()
            });
            if let Err(err) = paid {
                warn!(room = %self.code(), pot = index, error = %err, "showdown payout failed");
            }
        }
        self.finish_hand();
    }

    /// Deal any community cards still missing, burning before each street.
    fn complete_board(&mut self) {
        while self.state.community_cards.len() < 5 {
            self.deck.burn_card();
            let street = if self.state.community_cards.is_empty() { 3 } else { 1 };
            for _ in 0..street {
                if let Some(card) = self.deck.deal_card() {
                    self.state.community_cards.push(card);
                }
            }
            if self.deck.remaining() == 0 {
                break;
            }
        }
    }

    /// Ask the dealer to name the winners of the first pot holding chips.
    pub(crate) fn request_winner(&mut self) {
        let Some(index) = self.ledger.next_unsettled() else {
            return;
        };
        let pot = &self.ledger.pots()[index];
        let contenders: Vec<usize> = pot
            .contenders
            .iter()
            .filter_map(|id| self.seat_of(id))
            .collect();
        let event = TableEvent::ChooseWinnerRequest {
            pot_index: index,
            pot_amount: pot.amount,
            contenders,
        };
        self.emit(Audience::Room, event);
    }

    /// Physical-deck settlement: split `amount` of the current pot between
    /// the chosen seats. Every seat must contend for that pot.
    pub fn choose_winners(&mut self, seats: &[usize], amount: u32) -> Result<(), GameError> {
        if !self.physical_deck || self.state.phase != Phase::Showdown {
            return Err(InvalidAction::NoShowdownPending.into());
        }
        let index = self
            .ledger
            .next_unsettled()
            .ok_or(InvalidAction::NoShowdownPending)?;
        let pot = &self.ledger.pots()[index];
        if seats.is_empty() {
            return Err(InvalidAction::IneligibleWinner.into());
        }
        if amount == 0 {
            return Err(InvalidAction::NonPositiveAmount.into());
        }
        if amount > pot.amount {
            return Err(InvalidAction::InsufficientBalance.into());
        }
        for (i, &seat) in seats.iter().enumerate() {
            let eligible = self
                .players
                .get(seat)
                .is_some_and(|p| pot.is_contender(&p.id));
            if !eligible || seats[..i].contains(&seat) {
                return Err(InvalidAction::IneligibleWinner.into());
            }
        }

        self.pay_out(index, amount, seats, |_, _| "Chosen by the dealer".to_string())?;
        if self.ledger.next_unsettled().is_some() {
            self.request_winner();
            self.emit_state();
        } else {
            self.finish_hand();
        }
        Ok(())
    }

    /// Record the hand and clear the pots.
    pub(crate) fn finish_hand(&mut self) {
        let summary = HandSummary {
            hand_number: self.hand_number(),
            board: self.state.community_cards.clone(),
            actions: std::mem::take(&mut self.history),
            payouts: std::mem::take(&mut self.payouts),
            finished_at: Utc::now().to_rfc3339(),
        };
        info!(
            room = %self.code(),
            hand = summary.hand_number,
            payouts = summary.payouts.len(),
            "hand completed"
        );
        if self.ledger.total() > 0 {
            warn!(room = %self.code(), chips = self.ledger.total(), "hand closed with unsettled chips");
        }
        self.ledger.clear();
        if self.recent_hands.len() == RECENT_HANDS {
            self.recent_hands.pop_front();
        }
        self.recent_hands.push_back(summary.clone());
        self.emit(Audience::Room, TableEvent::HandCompleted { summary });
        self.emit_state();
    }
}
