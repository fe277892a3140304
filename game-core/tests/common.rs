use game_core::GameState;
use game_types::GuessOutcome;

/// Creates a game over 1 ~ 100 with a known secret
pub fn create_game_with_secret(secret: i32) -> GameState {
    GameState::with_secret(1, 100, secret).expect("1 ~ 100 is a valid range")
}

/// Plays a sequence of guesses, returning the final state and every outcome
pub fn play_guesses(mut state: GameState, guesses: &[i64]) -> (GameState, Vec<GuessOutcome>) {
    let mut outcomes = Vec::new();
    for guess in guesses {
        let (next, outcome) = state.guess(*guess).expect("guess should be accepted");
        outcomes.push(outcome);
        state = next;
    }
    (state, outcomes)
}

/// Binary search for the secret, the way an optimal player would
pub fn solve_by_bisection(mut state: GameState) -> GameState {
    while !state.is_won() {
        let (low, high) = state.feasible_range();
        let midpoint = i64::from(low) + (i64::from(high) - i64::from(low)) / 2;
        let (next, _) = state.guess(midpoint).expect("midpoint is always in range");
        state = next;
    }
    state
}
