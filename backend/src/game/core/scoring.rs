use super::geo::{Coordinate, round1};
use super::player::Player;
use super::round::Round;
use serde::{Deserialize, Serialize};

/// One line of a round's results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResultEntry {
    pub player_id: String,
    pub name: String,
    /// Distance scored this round (adjusted guess distance or penalty)
    pub km: f64,
    pub total_km: f64,
    pub guess: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub name: String,
    pub total_km: f64,
}

/// Score every roster player for a finished round and add to their totals.
///
/// Players without a guess score `penalty_km`, and no guess scores worse
/// than that. Results are ordered by this
/// round's distance, closest first; ties keep roster order.
pub fn score_round(players: &mut [Player], round: &Round, penalty_km: f64) -> Vec<RoundResultEntry> {
    let mut scored: Vec<(f64, RoundResultEntry)> = players
        .iter_mut()
        .map(|player| {
            let guess = round.guesses.get(&player.id);
            let km = guess.map_or(penalty_km, |g| g.adjusted_km.min(penalty_km));
            player.total_km += km;

            let entry = RoundResultEntry {
                player_id: player.id.clone(),
                name: player.name.clone(),
                km: round1(km),
                total_km: round1(player.total_km),
                guess: guess.map(|g| g.coordinate),
            };
            (km, entry)
        })
        .collect();

    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().map(|(_, entry)| entry).collect()
}

/// All players ordered by cumulative distance, lowest first
pub fn leaderboard(players: &[Player]) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&Player> = players.iter().collect();
    ranked.sort_by(|a, b| a.total_km.total_cmp(&b.total_km));
    ranked
        .into_iter()
        .map(|p| LeaderboardEntry {
            player_id: p.id.clone(),
            name: p.name.clone(),
            total_km: round1(p.total_km),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> Vec<Player> {
        vec![
            Player::new("a", "Alice", "c-a"),
            Player::new("b", "Bob", "c-b"),
            Player::new("c", "Carol", "c-c"),
        ]
    }

    fn round() -> Round {
        Round::new(1, Coordinate::new(51.5074, -0.1278), "London".into(), 0, 20_000)
    }

    #[test]
    fn missing_guess_scores_penalty() {
        let mut players = players();
        let mut round = round();
        round.record_guess("a", Coordinate::new(51.5, -0.12), 10.0, 1);

        let results = score_round(&mut players, &round, 20_000.0);

        let bob = results.iter().find(|r| r.player_id == "b").unwrap();
        assert_eq!(bob.km, 20_000.0);
        assert_eq!(bob.guess, None);
        assert_eq!(players[1].total_km, 20_000.0);
    }

    #[test]
    fn far_guess_is_capped_at_penalty() {
        let mut players = players();
        let mut round = round();
        // Near the antipode of London
        round.record_guess("a", Coordinate::new(-51.5, 179.8), 0.0, 1);

        let results = score_round(&mut players, &round, 1_000.0);

        assert_eq!(results[0].km, 1_000.0);
        assert_eq!(players[0].total_km, 1_000.0);
        assert!(results[0].guess.is_some());
    }

    #[test]
    fn results_sorted_closest_first_with_stable_ties() {
        let mut players = players();
        let mut round = round();
        // Carol far, Alice and Bob both inside the free radius
        round.record_guess("c", Coordinate::new(48.8566, 2.3522), 10.0, 1);
        round.record_guess("b", Coordinate::new(51.5, -0.12), 10.0, 1);
        round.record_guess("a", Coordinate::new(51.51, -0.13), 10.0, 1);

        let results = score_round(&mut players, &round, 20_000.0);
        let order: Vec<&str> = results.iter().map(|r| r.player_id.as_str()).collect();

        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(results[0].km, 0.0);
        assert_eq!(results[1].km, 0.0);
    }

    #[test]
    fn totals_accumulate_across_rounds() {
        let mut players = players();
        let mut expected = [0.0_f64; 3];

        for n in 1..=3 {
            let mut round = Round::new(n, Coordinate::new(0.0, 0.0), "Null Island".into(), 0, 10_000);
            let receipt = round.record_guess("a", Coordinate::new(n as f64, 0.0), 0.0, 1);
            expected[0] += receipt.adjusted_km;
            expected[1] += 500.0;
            expected[2] += 500.0;
            score_round(&mut players, &round, 500.0);
        }

        for (player, total) in players.iter().zip(expected) {
            assert!((player.total_km - total).abs() < 1e-9);
        }
    }

    #[test]
    fn leaderboard_orders_by_total() {
        let mut players = players();
        players[0].total_km = 300.0;
        players[1].total_km = 100.0;
        players[2].total_km = 200.0;

        let board = leaderboard(&players);
        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["Bob", "Carol", "Alice"]);
    }
}
