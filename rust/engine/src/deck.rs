use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::cards::{full_deck, Card};

/// The undealt cards of one table. Reshuffled at the start of every hand.
#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
    position: usize,
    rng: ChaCha20Rng,
}

impl Deck {
    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    /// Deck seeded from the thread-local generator.
    pub fn new_random() -> Self {
        Self::with_rng(ChaCha20Rng::from_rng(&mut rand::rng()))
    }

    fn with_rng(rng: ChaCha20Rng) -> Self {
        // Keep initial order until shuffle is called explicitly
        Self {
            cards: full_deck(),
            position: 0,
            rng,
        }
    }

    pub fn shuffle(&mut self) {
        self.cards = full_deck();
        self.cards.shuffle(&mut self.rng);
        self.position = 0;
    }

    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.position).copied()?;
        self.position += 1;
        Some(card)
    }

    pub fn burn_card(&mut self) {
        let _ = self.deal_card();
    }

    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn shuffled_deck_holds_52_unique_cards() {
        let mut deck = Deck::new_with_seed(7);
        deck.shuffle();
        let mut seen = HashSet::new();
        while let Some(card) = deck.deal_card() {
            assert!(seen.insert(card), "duplicate card {card}");
        }
        assert_eq!(seen.len(), 52);
        assert_eq!(deck.remaining(), 0);
        assert!(deck.deal_card().is_none());
    }

    #[test]
    fn same_seed_same_order() {
        let mut a = Deck::new_with_seed(42);
        let mut b = Deck::new_with_seed(42);
        a.shuffle();
        b.shuffle();
        let first: Vec<_> = (0..10).filter_map(|_| a.deal_card()).collect();
        let second: Vec<_> = (0..10).filter_map(|_| b.deal_card()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn burn_consumes_one_card() {
        let mut deck = Deck::new_with_seed(1);
        deck.shuffle();
        deck.burn_card();
        assert_eq!(deck.remaining(), 51);
    }
}
