//! Pot ledger: every chip wagered in a hand and the pots it forms.
//!
//! Chips are recorded per player as a hand-long stake. Pots are derived from
//! the stakes: each distinct all-in level caps a layer, so a short all-in
//! splits the pot it lands in. The capped layer keeps the all-in player as a
//! contender and the chips above the cap move to a new pot without them.

use crate::errors::InvalidAction;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StakeState {
    Live,
    AllIn,
    Forfeited,
}

#[derive(Debug, Clone)]
struct Stake {
    player: PlayerId,
    amount: u32,
    state: StakeState,
}

/// Chips committed to one pot and the players still able to win them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pot {
    pub amount: u32,
    /// Eligible winners, in seat order
    pub contenders: Vec<PlayerId>,
}

impl Pot {
    pub fn is_contender(&self, player: &str) -> bool {
        self.contenders.iter().any(|c| c == player)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PotLedger {
    stakes: Vec<Stake>,
    pots: Vec<Pot>,
    frozen: bool,
}

impl PotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a hand for the given participants, in seat order.
    pub fn open_hand<I>(&mut self, participants: I)
    where
        I: IntoIterator<Item = PlayerId>,
    {
        self.stakes = participants
            .into_iter()
            .map(|player| Stake {
                player,
                amount: 0,
                state: StakeState::Live,
            })
            .collect();
        self.frozen = false;
        self.rebuild();
    }

    /// Record `amount` more chips from `player`. `all_in` marks that the
    /// player has nothing left behind.
    pub fn commit(&mut self, player: &str, amount: u32, all_in: bool) {
        if self.frozen {
            return;
        }
        let idx = match self.stakes.iter().position(|s| s.player == player) {
            Some(idx) => idx,
            None => {
                self.stakes.push(Stake {
                    player: player.to_string(),
                    amount: 0,
                    state: StakeState::Live,
                });
                self.stakes.len() - 1
            }
        };
        let stake = &mut self.stakes[idx];
        stake.amount += amount;
        if all_in {
            stake.state = StakeState::AllIn;
        }
        self.rebuild();
    }

    /// The player gives up every claim; their chips stay in the pots.
    pub fn forfeit(&mut self, player: &str) {
        if self.frozen {
            for pot in &mut self.pots {
                pot.contenders.retain(|c| c != player);
            }
            self.merge_orphaned();
            return;
        }
        if let Some(stake) = self.stakes.iter_mut().find(|s| s.player == player) {
            stake.state = StakeState::Forfeited;
        }
        self.rebuild();
    }

    /// Give back the part of the largest stake that nobody matched. Returns
    /// the owner and the chips to return.
    pub fn refund_uncalled(&mut self) -> Option<(PlayerId, u32)> {
        if self.frozen {
            return None;
        }
        let (top, _) = self
            .stakes
            .iter()
            .enumerate()
            .max_by_key(|(_, s)| s.amount)?;
        let matched = self
            .stakes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != top)
            .map(|(_, s)| s.amount)
            .max()
            .unwrap_or(0);
        let stake = &mut self.stakes[top];
        if stake.state == StakeState::Forfeited || stake.amount <= matched {
            return None;
        }
        let excess = stake.amount - matched;
        stake.amount = matched;
        let player = stake.player.clone();
        self.rebuild();
        Some((player, excess))
    }

    /// Pots nobody can win any more fall into the pot before them, whose
    /// contenders are a superset.
    fn merge_orphaned(&mut self) {
        for index in (1..self.pots.len()).rev() {
            if self.pots[index].contenders.is_empty() && self.pots[index].amount > 0 {
                let amount = std::mem::take(&mut self.pots[index].amount);
                self.pots[index - 1].amount += amount;
            }
        }
        self.pots
            .retain(|pot| pot.amount > 0 || !pot.contenders.is_empty());
    }

    /// Stop deriving pots from stakes; from here on only payouts change them.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn pots(&self) -> &[Pot] {
        &self.pots
    }

    pub fn total(&self) -> u32 {
        self.pots.iter().map(|p| p.amount).sum()
    }

    pub fn stake_of(&self, player: &str) -> u32 {
        self.stakes
            .iter()
            .find(|s| s.player == player)
            .map(|s| s.amount)
            .unwrap_or(0)
    }

    /// Index of the first pot that still holds chips.
    pub fn next_unsettled(&self) -> Option<usize> {
        self.pots.iter().position(|p| p.amount > 0)
    }

    /// Take `amount` out of pot `index` for payout.
    pub fn debit(&mut self, index: usize, amount: u32) -> Result<(), InvalidAction> {
        let pot = self
            .pots
            .get_mut(index)
            .ok_or(InvalidAction::NoShowdownPending)?;
        if amount == 0 {
            return Err(InvalidAction::NonPositiveAmount);
        }
        if amount > pot.amount {
            return Err(InvalidAction::InsufficientBalance);
        }
        pot.amount -= amount;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.stakes.clear();
        self.pots.clear();
        self.frozen = false;
    }

    fn rebuild(&mut self) {
        let mut caps: Vec<u32> = self
            .stakes
            .iter()
            .filter(|s| s.state == StakeState::AllIn && s.amount > 0)
            .map(|s| s.amount)
            .collect();
        caps.sort_unstable();
        caps.dedup();

        let mut pots: Vec<Pot> = Vec::with_capacity(caps.len() + 1);
        let mut floor = 0;
        for cap in caps {
            let amount = self
                .stakes
                .iter()
                .map(|s| s.amount.min(cap).saturating_sub(floor))
                .sum();
            let contenders = self
                .stakes
                .iter()
                .filter(|s| match s.state {
                    StakeState::Live => true,
                    StakeState::AllIn => s.amount >= cap,
                    StakeState::Forfeited => false,
                })
                .map(|s| s.player.clone())
                .collect();
            pots.push(Pot { amount, contenders });
            floor = cap;
        }

        let amount: u32 = self
            .stakes
            .iter()
            .map(|s| s.amount.saturating_sub(floor))
            .sum();
        let contenders: Vec<PlayerId> = self
            .stakes
            .iter()
            .filter(|s| s.state == StakeState::Live)
            .map(|s| s.player.clone())
            .collect();

        match pots.last_mut() {
            // chips above every remaining claim go back to the last contested pot
            Some(last) if contenders.is_empty() => last.amount += amount,
            Some(_) if amount == 0 => {}
            _ => pots.push(Pot { amount, contenders }),
        }
        self.pots = pots;
    }
}
