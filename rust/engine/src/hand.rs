//! Hand strength. The table only talks to [`HandEvaluator`]; the
//! [`StandardEvaluator`] here is the stock implementation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cards::{Card, Suit};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
}

/// Comparable strength of a player's best five cards.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct RankedHand {
    pub category: Category,
    // kickers: ordered high -> low for tiebreaks
    pub kickers: [u8; 5],
}

impl RankedHand {
    pub fn describe(&self) -> String {
        let k = &self.kickers;
        match self.category {
            Category::HighCard => format!("High Card, {}", rank_name(k[0])),
            Category::OnePair => format!("Pair of {}", plural(k[0])),
            Category::TwoPair => format!("Two Pair, {} and {}", plural(k[0]), plural(k[1])),
            Category::ThreeOfAKind => format!("Three of a Kind, {}", plural(k[0])),
            Category::Straight => format!("Straight, {} high", rank_name(k[0])),
            Category::Flush => format!("Flush, {} high", rank_name(k[0])),
            Category::FullHouse => format!("Full House, {} over {}", plural(k[0]), plural(k[1])),
            Category::FourOfAKind => format!("Four of a Kind, {}", plural(k[0])),
            Category::StraightFlush if k[0] == 14 => "Royal Flush".to_string(),
            Category::StraightFlush => format!("Straight Flush, {} high", rank_name(k[0])),
        }
    }
}

impl fmt::Display for RankedHand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Ranks showdown hands. The table depends on this capability only.
pub trait HandEvaluator: Send + Sync {
    /// Best hand out of a player's hole cards plus the board (5 to 7 cards).
    fn evaluate(&self, cards: &[Card]) -> RankedHand;

    /// Indices into `hands` of every hand tied for best.
    fn rank_winners(&self, hands: &[RankedHand]) -> Vec<usize> {
        let Some(best) = hands.iter().max() else {
            return Vec::new();
        };
        hands
            .iter()
            .enumerate()
            .filter(|(_, h)| *h == best)
            .map(|(i, _)| i)
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardEvaluator;

impl HandEvaluator for StandardEvaluator {
    fn evaluate(&self, cards: &[Card]) -> RankedHand {
        evaluate_hand(cards)
    }
}

pub fn evaluate_hand(cards: &[Card]) -> RankedHand {
    // Count ranks and group by suit
    let mut rank_counts = [0u8; 15]; // 2..14 used
    let mut by_suit: [Vec<u8>; 4] = Default::default();
    for c in cards {
        let r = c.rank.value();
        rank_counts[r as usize] += 1;
        by_suit[suit_index(c.suit)].push(r);
    }

    let flush_ranks = by_suit.iter().find(|ranks| ranks.len() >= 5).map(|ranks| {
        let mut v = ranks.clone();
        v.sort_unstable_by(|a, b| b.cmp(a));
        v
    });

    if let Some(high) = flush_ranks.as_deref().and_then(straight_high) {
        return ranked(Category::StraightFlush, &[high]);
    }

    let (quads, trips, pairs) = classify_multiples(&rank_counts);

    if let Some(&quad) = quads.first() {
        let kicker = others(&rank_counts, &[quad]);
        return ranked(Category::FourOfAKind, &[quad, first(&kicker)]);
    }

    if let Some(&trip) = trips.first() {
        let pair = trips.get(1).copied().into_iter().chain(pairs.first().copied()).max();
        if let Some(pair) = pair {
            return ranked(Category::FullHouse, &[trip, pair]);
        }
    }

    if let Some(ranks) = flush_ranks {
        return ranked(Category::Flush, &ranks[..5]);
    }

    let distinct: Vec<u8> = (2..=14u8).filter(|&r| rank_counts[r as usize] > 0).collect();
    if let Some(high) = straight_high(&distinct) {
        return ranked(Category::Straight, &[high]);
    }

    if let Some(&trip) = trips.first() {
        let rest = others(&rank_counts, &[trip]);
        return ranked(Category::ThreeOfAKind, &with_kickers(&[trip], &rest, 2));
    }

    if pairs.len() >= 2 {
        let (high, low) = (pairs[0], pairs[1]);
        let rest = others(&rank_counts, &[high, low]);
        return ranked(Category::TwoPair, &with_kickers(&[high, low], &rest, 1));
    }

    if let Some(&pair) = pairs.first() {
        let rest = others(&rank_counts, &[pair]);
        return ranked(Category::OnePair, &with_kickers(&[pair], &rest, 3));
    }

    let rest = others(&rank_counts, &[]);
    ranked(Category::HighCard, &with_kickers(&[], &rest, 5))
}

fn ranked(category: Category, leading: &[u8]) -> RankedHand {
    let mut kickers = [0u8; 5];
    for (slot, &r) in kickers.iter_mut().zip(leading) {
        *slot = r;
    }
    RankedHand { category, kickers }
}

fn with_kickers(leading: &[u8], rest: &[u8], n: usize) -> Vec<u8> {
    leading.iter().chain(rest.iter().take(n)).copied().collect()
}

fn first(ranks: &[u8]) -> u8 {
    ranks.first().copied().unwrap_or(0)
}

fn suit_index(s: Suit) -> usize {
    match s {
        Suit::Clubs => 0,
        Suit::Diamonds => 1,
        Suit::Hearts => 2,
        Suit::Spades => 3,
    }
}

/// Quads, trips and pairs, each ordered high -> low.
fn classify_multiples(rank_counts: &[u8; 15]) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let mut quads = vec![];
    let mut trips = vec![];
    let mut pairs = vec![];
    for r in (2..=14u8).rev() {
        match rank_counts[r as usize] {
            4 => quads.push(r),
            3 => trips.push(r),
            2 => pairs.push(r),
            _ => {}
        }
    }
    (quads, trips, pairs)
}

/// Distinct ranks present, high -> low, excluding `used`.
fn others(rank_counts: &[u8; 15], used: &[u8]) -> Vec<u8> {
    (2..=14u8)
        .rev()
        .filter(|r| rank_counts[*r as usize] > 0 && !used.contains(r))
        .collect()
}

fn straight_high(ranks: &[u8]) -> Option<u8> {
    let mut mask: u16 = 0;
    for &r in ranks {
        mask |= 1 << r;
    }
    // Ace also plays low
    if mask & (1 << 14) != 0 {
        mask |= 1 << 1;
    }
    (5..=14u8).rev().find(|&high| {
        let window = 0b1_1111u16 << (high - 4);
        mask & window == window
    })
}

fn rank_name(v: u8) -> &'static str {
    match v {
        2 => "Two",
        3 => "Three",
        4 => "Four",
        5 => "Five",
        6 => "Six",
        7 => "Seven",
        8 => "Eight",
        9 => "Nine",
        10 => "Ten",
        11 => "Jack",
        12 => "Queen",
        13 => "King",
        _ => "Ace",
    }
}

fn plural(v: u8) -> String {
    match v {
        6 => "Sixes".to_string(),
        _ => format!("{}s", rank_name(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Rank::*;
    use crate::cards::Suit::*;
    use crate::cards::{Rank, Suit};

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn royal_flush_beats_everything() {
        let cards = [
            c(Ace, Hearts),
            c(King, Hearts),
            c(Queen, Hearts),
            c(Jack, Hearts),
            c(Ten, Hearts),
            c(Two, Clubs),
            c(Three, Diamonds),
        ];
        let hand = evaluate_hand(&cards);
        assert_eq!(hand.category, Category::StraightFlush);
        assert_eq!(hand.describe(), "Royal Flush");
    }

    #[test]
    fn wheel_straight_is_five_high() {
        let cards = [
            c(Ace, Hearts),
            c(Two, Clubs),
            c(Three, Diamonds),
            c(Four, Spades),
            c(Five, Hearts),
            c(King, Clubs),
            c(Nine, Diamonds),
        ];
        let hand = evaluate_hand(&cards);
        assert_eq!(hand.category, Category::Straight);
        assert_eq!(hand.kickers[0], 5);
    }

    #[test]
    fn two_trips_make_a_full_house() {
        let cards = [
            c(Six, Hearts),
            c(Six, Clubs),
            c(Six, Diamonds),
            c(Nine, Spades),
            c(Nine, Hearts),
            c(Nine, Clubs),
            c(Two, Diamonds),
        ];
        let hand = evaluate_hand(&cards);
        assert_eq!(hand.category, Category::FullHouse);
        assert_eq!(hand.describe(), "Full House, Nines over Sixes");
    }

    #[test]
    fn third_pair_can_play_as_kicker() {
        let cards = [
            c(King, Hearts),
            c(King, Clubs),
            c(Queen, Diamonds),
            c(Queen, Spades),
            c(Jack, Hearts),
            c(Jack, Clubs),
            c(Two, Diamonds),
        ];
        let hand = evaluate_hand(&cards);
        assert_eq!(hand.category, Category::TwoPair);
        assert_eq!(hand.kickers, [13, 12, 11, 0, 0]);
    }

    #[test]
    fn kickers_break_pair_ties() {
        let board = [c(Ace, Hearts), c(Ace, Clubs), c(Seven, Diamonds), c(Four, Spades), c(Two, Hearts)];
        let mut a: Vec<Card> = board.to_vec();
        a.extend([c(King, Clubs), c(Three, Diamonds)]);
        let mut b: Vec<Card> = board.to_vec();
        b.extend([c(Queen, Clubs), c(Three, Clubs)]);
        let eval = StandardEvaluator;
        let hands = vec![eval.evaluate(&a), eval.evaluate(&b)];
        assert_eq!(eval.rank_winners(&hands), vec![0]);
    }

    #[test]
    fn board_plays_for_a_split() {
        let board = [c(Ten, Hearts), c(Jack, Clubs), c(Queen, Diamonds), c(King, Spades), c(Ace, Hearts)];
        let mut a: Vec<Card> = board.to_vec();
        a.extend([c(Two, Clubs), c(Three, Diamonds)]);
        let mut b: Vec<Card> = board.to_vec();
        b.extend([c(Four, Clubs), c(Five, Spades)]);
        let eval = StandardEvaluator;
        let hands = vec![eval.evaluate(&a), eval.evaluate(&b)];
        assert_eq!(eval.rank_winners(&hands), vec![0, 1]);
    }
}
