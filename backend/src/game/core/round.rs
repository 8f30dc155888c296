use super::geo::{Coordinate, adjusted_distance, haversine_km};
use std::collections::HashMap;

/// A player's guess for the current round. Resubmissions overwrite the
/// latest coordinate but keep the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct Guess {
    pub coordinate: Coordinate,
    pub raw_km: f64,
    pub adjusted_km: f64,
    pub submitted_at_ms: u64,
    pub first_coordinate: Coordinate,
    pub first_submitted_at_ms: u64,
    pub revisions: u32,
}

/// A single scoring period with one target
#[derive(Debug, Clone)]
pub struct Round {
    pub number: u32,
    pub target: Coordinate,
    pub city_name: String,
    pub started_at_ms: u64,
    pub deadline_at_ms: u64,
    pub guesses: HashMap<String, Guess>,
}

/// What the submitting player is told about their guess
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuessReceipt {
    pub raw_km: f64,
    pub adjusted_km: f64,
    pub resubmitted: bool,
}

impl Round {
    pub fn new(
        number: u32,
        target: Coordinate,
        city_name: String,
        started_at_ms: u64,
        duration_ms: u64,
    ) -> Self {
        Self {
            number,
            target,
            city_name,
            started_at_ms,
            deadline_at_ms: started_at_ms + duration_ms,
            guesses: HashMap::new(),
        }
    }

    /// Record or overwrite a player's guess
    pub fn record_guess(
        &mut self,
        player_id: &str,
        coordinate: Coordinate,
        free_radius_km: f64,
        now_ms: u64,
    ) -> GuessReceipt {
        let raw_km = haversine_km(coordinate, self.target);
        let adjusted_km = adjusted_distance(raw_km, free_radius_km);

        let resubmitted = match self.guesses.get_mut(player_id) {
            Some(guess) => {
                guess.coordinate = coordinate;
                guess.raw_km = raw_km;
                guess.adjusted_km = adjusted_km;
                guess.submitted_at_ms = now_ms;
                guess.revisions += 1;
                true
            }
            None => {
                self.guesses.insert(
                    player_id.to_string(),
                    Guess {
                        coordinate,
                        raw_km,
                        adjusted_km,
                        submitted_at_ms: now_ms,
                        first_coordinate: coordinate,
                        first_submitted_at_ms: now_ms,
                        revisions: 0,
                    },
                );
                false
            }
        };

        GuessReceipt {
            raw_km,
            adjusted_km,
            resubmitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london_round() -> Round {
        Round::new(1, Coordinate::new(51.5074, -0.1278), "London".into(), 1_000, 20_000)
    }

    #[test]
    fn deadline_is_start_plus_duration() {
        let round = london_round();
        assert_eq!(round.deadline_at_ms, 21_000);
        assert!(round.guesses.is_empty());
    }

    #[test]
    fn first_guess_is_not_a_resubmission() {
        let mut round = london_round();
        let receipt = round.record_guess("p1", Coordinate::new(48.8566, 2.3522), 10.0, 2_000);

        assert!(!receipt.resubmitted);
        assert!(receipt.raw_km > 300.0);
        assert_eq!(receipt.adjusted_km, receipt.raw_km - 10.0);
    }

    #[test]
    fn resubmission_overwrites_but_keeps_first_guess() {
        let mut round = london_round();
        let paris = Coordinate::new(48.8566, 2.3522);
        let near_london = Coordinate::new(51.5, -0.12);

        round.record_guess("p1", paris, 0.0, 2_000);
        let receipt = round.record_guess("p1", near_london, 0.0, 3_000);

        assert!(receipt.resubmitted);
        let guess = &round.guesses["p1"];
        assert_eq!(guess.coordinate, near_london);
        assert_eq!(guess.first_coordinate, paris);
        assert_eq!(guess.submitted_at_ms, 3_000);
        assert_eq!(guess.first_submitted_at_ms, 2_000);
        assert_eq!(guess.revisions, 1);
        assert!(guess.raw_km < 2.0);
    }
}
