use thiserror::Error;

use crate::player::PlayerId;
use crate::table::RoomCode;

/// Errors reported to the caller of a room operation. None of them leave
/// the room in a modified state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Game not found: {0}")]
    GameNotFound(RoomCode),
    #[error("Game is full (max {max} players)")]
    RoomFull { max: usize },
    #[error("Name already taken: {0}")]
    NameTaken(String),
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Player not found in game: {0}")]
    PlayerNotFound(PlayerId),
    #[error("Player already seated: {0}")]
    AlreadySeated(PlayerId),
    #[error("Invalid action: {0}")]
    InvalidAction(#[from] InvalidAction),
    #[error("Room storage poisoned")]
    StoragePoisoned,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidAction {
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("raise of {amount} is below the minimum raise of {minimum}")]
    BelowMinimumRaise { amount: u32, minimum: u32 },
    #[error("player has already folded")]
    PlayerFolded,
    #[error("player has no chips left")]
    NoChips,
    #[error("raise requires an amount")]
    MissingAmount,
    #[error("a hand is already in progress")]
    HandInProgress,
    #[error("no hand in progress")]
    NoHandInProgress,
    #[error("no showdown is waiting for a winner")]
    NoShowdownPending,
    #[error("selected winner is not eligible for this pot")]
    IneligibleWinner,
    #[error("name must not be empty")]
    EmptyName,
}
