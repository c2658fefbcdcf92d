//! Card types for the Tonk variant: a 40-card deck (standard deck minus
//! eights, nines and tens).

use serde::{Deserialize, Serialize};

/// Card suit.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    /// Suit as a display character (♥, ♦, ♣, ♠).
    pub fn icon(self) -> char {
        match self {
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
            Suit::Spades => '♠',
        }
    }
}

/// Card rank. Eights, nines and tens do not exist in this variant.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Jack,
    Queen,
    King,
}

impl Rank {
    /// All ranks in sequence order. Jack immediately follows Seven: this is
    /// the ordering used for runs and for hit adjacency.
    pub const ALL: [Rank; 10] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Position of this rank in the variant's sequence order (Ace=0 .. King=9).
    pub fn sequence_index(self) -> u8 {
        match self {
            Rank::Ace => 0,
            Rank::Two => 1,
            Rank::Three => 2,
            Rank::Four => 3,
            Rank::Five => 4,
            Rank::Six => 5,
            Rank::Seven => 6,
            Rank::Jack => 7,
            Rank::Queen => 8,
            Rank::King => 9,
        }
    }

    /// Point value counted toward hand totals: Ace=1, pip cards at face,
    /// court cards at 10.
    pub fn value(self) -> u32 {
        match self {
            Rank::Ace => 1,
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Jack | Rank::Queen | Rank::King => 10,
        }
    }

    /// Short face string (A, 2, .. 7, J, Q, K).
    pub fn face(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }
}

/// A playing card. Equality is (suit, rank); a deck never holds duplicates,
/// so a card is also its own identity.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Card { suit, rank }
    }

    pub fn value(self) -> u32 {
        self.rank.value()
    }

    /// Display label like "A♣" or "J♦".
    pub fn label(self) -> String {
        format!("{}{}", self.rank.face(), self.suit.icon())
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_values_follow_variant_rules() {
        assert_eq!(Rank::Ace.value(), 1);
        assert_eq!(Rank::Seven.value(), 7);
        assert_eq!(Rank::Jack.value(), 10);
        assert_eq!(Rank::King.value(), 10);
    }

    #[test]
    fn jack_follows_seven_in_sequence() {
        assert_eq!(
            Rank::Jack.sequence_index(),
            Rank::Seven.sequence_index() + 1
        );
        // The full order is dense: 0..=9 with no gaps.
        let indices: Vec<u8> = Rank::ALL.iter().map(|r| r.sequence_index()).collect();
        assert_eq!(indices, (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn card_equality_is_suit_and_rank() {
        let a = Card::new(Suit::Hearts, Rank::Ace);
        let b = Card::new(Suit::Hearts, Rank::Ace);
        let c = Card::new(Suit::Spades, Rank::Ace);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
