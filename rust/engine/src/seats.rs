//! Seat rotation. Seat order is join order and doubles as action order.

use crate::player::Player;

/// First seat after `from` (wrapping, `from` itself checked last) that
/// satisfies `pred`.
pub fn next_matching<F>(players: &[Player], from: usize, pred: F) -> Option<usize>
where
    F: Fn(&Player) -> bool,
{
    let n = players.len();
    if n == 0 {
        return None;
    }
    (1..=n)
        .map(|step| (from + step) % n)
        .find(|&idx| pred(&players[idx]))
}

/// Next seat after `from` whose player is neither folded nor all-in.
pub fn next_active(players: &[Player], from: usize) -> Option<usize> {
    next_matching(players, from, Player::is_active)
}

/// Seats satisfying `pred`, in rotation order starting at `start` inclusive.
pub fn rotation_from<F>(players: &[Player], start: usize, pred: F) -> Vec<usize>
where
    F: Fn(&Player) -> bool,
{
    let n = players.len();
    (0..n)
        .map(|step| (start + step) % n)
        .filter(|&idx| pred(&players[idx]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(flags: &[(bool, bool)]) -> Vec<Player> {
        flags
            .iter()
            .enumerate()
            .map(|(i, &(folded, all_in))| {
                let mut p = Player::new(format!("p{i}"), format!("P{i}"), 100);
                p.folded = folded;
                p.all_in = all_in;
                p
            })
            .collect()
    }

    #[test]
    fn skips_folded_and_all_in_seats() {
        let players = table(&[(false, false), (true, false), (false, true), (false, false)]);
        assert_eq!(next_active(&players, 0), Some(3));
        assert_eq!(next_active(&players, 3), Some(0));
    }

    #[test]
    fn returns_origin_when_it_is_the_only_candidate() {
        let players = table(&[(false, false), (true, false), (true, false)]);
        assert_eq!(next_active(&players, 0), Some(0));
    }

    #[test]
    fn none_when_nobody_can_act() {
        let players = table(&[(true, false), (false, true)]);
        assert_eq!(next_active(&players, 0), None);
        assert_eq!(next_active(&[], 0), None);
    }

    #[test]
    fn rotation_wraps_from_start() {
        let players = table(&[(false, false), (false, false), (true, false), (false, false)]);
        assert_eq!(rotation_from(&players, 3, Player::is_active), vec![3, 0, 1]);
    }
}
