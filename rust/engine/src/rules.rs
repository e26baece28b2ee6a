use crate::errors::InvalidAction;
use crate::player::Action as A;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedAction {
    Fold,
    Check,
    Call(u32),
    Raise { call: u32, raise: u32 },
    AllIn(u32),
}

/// Validates a player action against their balance and the table's betting
/// state without touching either.
///
/// Converts an [`crate::player::Action`] into a [`ValidatedAction`] carrying the
/// exact chip movement to perform. A call the player cannot cover becomes an
/// all-in, as does a raise that uses exactly the whole balance.
///
/// # Arguments
///
/// * `balance` - Player's chips not yet wagered
/// * `to_call` - Amount needed to match the highest bet of the street
/// * `min_raise` - Smallest legal raise increment (last full raise, or the big blind)
/// * `action` - The action the player wishes to perform
///
/// # Errors
///
/// - [`InvalidAction::NonPositiveAmount`] - Raise by zero
/// - [`InvalidAction::InsufficientBalance`] - Call plus raise exceeds the balance
/// - [`InvalidAction::BelowMinimumRaise`] - Raise increment below `min_raise`
/// - [`InvalidAction::NoChips`] - All-in with an empty balance
///
/// # Examples
///
/// ```
/// use holdem_engine::rules::{validate_action, ValidatedAction};
/// use holdem_engine::player::Action;
///
/// let result = validate_action(1000, 2, 2, Action::Raise(10));
/// assert_eq!(result, Ok(ValidatedAction::Raise { call: 2, raise: 10 }));
///
/// // Calling more than the balance goes all-in instead
/// let result = validate_action(80, 100, 2, Action::CheckOrCall);
/// assert_eq!(result, Ok(ValidatedAction::AllIn(80)));
/// ```
pub fn validate_action(
    balance: u32,
    to_call: u32,
    min_raise: u32,
    action: A,
) -> Result<ValidatedAction, InvalidAction> {
    match action {
        A::Fold => Ok(ValidatedAction::Fold),
        A::CheckOrCall => {
            if to_call == 0 {
                Ok(ValidatedAction::Check)
            } else if balance <= to_call {
                Ok(ValidatedAction::AllIn(balance))
            } else {
                Ok(ValidatedAction::Call(to_call))
            }
        }
        A::Raise(raise) => {
            if raise == 0 {
                return Err(InvalidAction::NonPositiveAmount);
            }
            let total = to_call
                .checked_add(raise)
                .ok_or(InvalidAction::InsufficientBalance)?;
            if total > balance {
                Err(InvalidAction::InsufficientBalance)
            } else if total == balance {
                Ok(ValidatedAction::AllIn(balance))
            } else if raise < min_raise {
                Err(InvalidAction::BelowMinimumRaise {
                    amount: raise,
                    minimum: min_raise,
                })
            } else {
                Ok(ValidatedAction::Raise {
                    call: to_call,
                    raise,
                })
            }
        }
        A::AllIn => {
            if balance == 0 {
                Err(InvalidAction::NoChips)
            } else {
                Ok(ValidatedAction::AllIn(balance))
            }
        }
    }
}
