use holdem_engine::errors::{GameError, InvalidAction};
use holdem_engine::events::{Audience, RecordingNotifier, TableEvent};
use holdem_engine::lobby::Lobby;
use holdem_engine::player::Action;
use holdem_engine::table::{Phase, TableConfig};
use std::sync::Arc;

/// Physical room with three players who limp and check down to a pot of 6.
fn to_showdown() -> (Lobby, RecordingNotifier, String) {
    let notifier = RecordingNotifier::new();
    let config = TableConfig::default();
    let lobby = Lobby::new(config, Arc::new(notifier.clone()));
    let code = lobby.create_room(true).expect("create");
    for name in ["a", "b", "c"] {
        lobby.join_room(&code, name.into(), name).expect("join");
    }
    lobby.start_hand(&code).expect("start");
    lobby.act(&code, "a", Action::CheckOrCall).expect("call");
    lobby.act(&code, "b", Action::CheckOrCall).expect("call");
    lobby.act(&code, "c", Action::CheckOrCall).expect("check");
    for _ in 0..3 {
        lobby.act(&code, "b", Action::CheckOrCall).expect("check");
        lobby.act(&code, "c", Action::CheckOrCall).expect("check");
        lobby.act(&code, "a", Action::CheckOrCall).expect("check");
    }
    (lobby, notifier, code)
}

fn requests(notifier: &RecordingNotifier, code: &str) -> Vec<(usize, u32, Vec<usize>)> {
    notifier
        .events_for(code, &Audience::Room)
        .into_iter()
        .filter_map(|e| match e {
            TableEvent::ChooseWinnerRequest {
                pot_index,
                pot_amount,
                contenders,
            } => Some((pot_index, pot_amount, contenders)),
            _ => None,
        })
        .collect()
}

#[test]
fn physical_room_deals_no_cards() {
    let (lobby, notifier, code) = to_showdown();
    let snap = lobby.snapshot(&code).expect("snapshot");
    assert!(snap.community_cards.is_empty());
    assert!(snap.players.iter().all(|p| p.card_count == 0));
    assert!(notifier
        .delivered()
        .iter()
        .all(|(_, n)| !matches!(n.event, TableEvent::PrivateHand { .. })));
}

#[test]
fn showdown_asks_the_dealer() {
    let (lobby, notifier, code) = to_showdown();
    let snap = lobby.snapshot(&code).expect("snapshot");
    assert_eq!(snap.phase, Phase::Showdown);
    assert_eq!(requests(&notifier, &code), vec![(0, 6, vec![0, 1, 2])]);
    // an unsettled showdown blocks the next hand
    assert_eq!(
        lobby.start_hand(&code),
        Err(GameError::InvalidAction(InvalidAction::HandInProgress))
    );
}

#[test]
fn invalid_choices_are_rejected() {
    let (lobby, _, code) = to_showdown();
    let before = lobby.snapshot(&code).expect("snapshot");
    let invalid = GameError::InvalidAction;
    assert_eq!(
        lobby.choose_winners(&code, &[7], 6),
        Err(invalid(InvalidAction::IneligibleWinner))
    );
    assert_eq!(
        lobby.choose_winners(&code, &[0, 0], 6),
        Err(invalid(InvalidAction::IneligibleWinner))
    );
    assert_eq!(
        lobby.choose_winners(&code, &[], 6),
        Err(invalid(InvalidAction::IneligibleWinner))
    );
    assert_eq!(
        lobby.choose_winners(&code, &[0], 0),
        Err(invalid(InvalidAction::NonPositiveAmount))
    );
    assert_eq!(
        lobby.choose_winners(&code, &[0], 7),
        Err(invalid(InvalidAction::InsufficientBalance))
    );
    assert_eq!(lobby.snapshot(&code).expect("snapshot"), before);
}

#[test]
fn partial_award_reissues_the_request() {
    let (lobby, notifier, code) = to_showdown();
    notifier.clear();
    lobby.choose_winners(&code, &[0], 4).expect("partial");
    assert_eq!(requests(&notifier, &code), vec![(0, 2, vec![0, 1, 2])]);

    notifier.clear();
    lobby.choose_winners(&code, &[1, 2], 2).expect("rest");
    assert!(requests(&notifier, &code).is_empty());
    let snap = lobby.snapshot(&code).expect("snapshot");
    let balances: Vec<u32> = snap.players.iter().map(|p| p.balance).collect();
    assert_eq!(balances, vec![1002, 999, 999]);
    assert!(snap.pots.is_empty());
    assert!(notifier
        .events_for(&code, &Audience::Room)
        .iter()
        .any(|e| matches!(e, TableEvent::HandCompleted { .. })));
}

#[test]
fn folded_player_cannot_be_chosen() {
    let notifier = RecordingNotifier::new();
    let lobby = Lobby::new(TableConfig::default(), Arc::new(notifier.clone()));
    let code = lobby.create_room(true).expect("create");
    for name in ["a", "b", "c"] {
        lobby.join_room(&code, name.into(), name).expect("join");
    }
    lobby.start_hand(&code).expect("start");
    lobby.act(&code, "a", Action::Fold).expect("fold");
    lobby.act(&code, "b", Action::CheckOrCall).expect("call");
    lobby.act(&code, "c", Action::CheckOrCall).expect("check");
    for _ in 0..3 {
        lobby.act(&code, "b", Action::CheckOrCall).expect("check");
        lobby.act(&code, "c", Action::CheckOrCall).expect("check");
    }
    assert_eq!(
        lobby.choose_winners(&code, &[0], 4),
        Err(GameError::InvalidAction(InvalidAction::IneligibleWinner))
    );
    lobby.choose_winners(&code, &[1, 2], 4).expect("split");
    let snap = lobby.snapshot(&code).expect("snapshot");
    assert_eq!(snap.player("b").expect("b").balance, 1000);
    assert_eq!(snap.player("c").expect("c").balance, 1000);
}

#[test]
fn automatic_rooms_reject_manual_settlement() {
    let lobby = Lobby::default();
    let code = lobby.create_room(false).expect("create");
    assert_eq!(
        lobby.choose_winners(&code, &[0], 1),
        Err(GameError::InvalidAction(InvalidAction::NoShowdownPending))
    );
}

/// After one split hand the stacks are a 998, b 1001, c 1001 and the
/// second hand is dealt with b on the button and a in the big blind.
fn uneven_stacks() -> (Lobby, RecordingNotifier, String) {
    let (lobby, notifier, code) = to_showdown();
    lobby.choose_winners(&code, &[1, 2], 6).expect("split");
    lobby.start_hand(&code).expect("second hand");
    notifier.clear();
    (lobby, notifier, code)
}

#[test]
fn contenders_leaving_a_showdown_release_the_pots() {
    let (lobby, notifier, code) = uneven_stacks();
    lobby.act(&code, "b", Action::AllIn).expect("shove");
    lobby.act(&code, "c", Action::CheckOrCall).expect("call all-in");
    lobby.act(&code, "a", Action::AllIn).expect("short all-in");
    assert_eq!(
        requests(&notifier, &code),
        vec![(0, 2994, vec![0, 1, 2])]
    );

    notifier.clear();
    lobby.remove_player(&code, "b").expect("b leaves");
    assert_eq!(requests(&notifier, &code), vec![(0, 2994, vec![0, 1])]);

    notifier.clear();
    lobby.choose_winners(&code, &[0], 2994).expect("main pot");
    assert_eq!(requests(&notifier, &code), vec![(1, 6, vec![1])]);

    // the side pot loses its last contender and falls back to a
    lobby.remove_player(&code, "c").expect("c leaves");
    let snap = lobby.snapshot(&code).expect("snapshot");
    assert!(snap.pots.is_empty());
    assert_eq!(snap.player("a").expect("a").balance, 3000);
    assert_eq!(lobby.start_hand(&code), Ok(false));
}

#[test]
fn uncalled_raise_returns_before_the_dealer_is_asked() {
    let (lobby, notifier, code) = uneven_stacks();
    lobby.act(&code, "b", Action::AllIn).expect("shove");
    lobby.act(&code, "c", Action::Fold).expect("fold");
    lobby.act(&code, "a", Action::AllIn).expect("short all-in");

    assert_eq!(requests(&notifier, &code), vec![(0, 1997, vec![0, 1])]);
    let snap = lobby.snapshot(&code).expect("snapshot");
    assert_eq!(snap.player("b").expect("b").balance, 3);
    assert_eq!(snap.pot_total(), 1997);

    lobby.remove_player(&code, "b").expect("b leaves");
    let snap = lobby.snapshot(&code).expect("snapshot");
    assert!(snap.pots.is_empty());
    assert_eq!(snap.player("a").expect("a").balance, 1997);
    assert_eq!(lobby.start_hand(&code), Ok(true));
}
