use game_types::{Difficulty, GameSnapshot, GuessOutcome, NewScore};
use rand::Rng;
use tracing::debug;

use crate::errors::{ConfigError, ValidationError};
use crate::validation::validate_range;

/// Server-held state of one guessing game.
///
/// Fields are private so that `min <= feasible_low <= secret <= feasible_high <= max`
/// holds for every value of this type. A state is never mutated in place;
/// [`GameState::guess`] returns the next state instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    secret: i32, // Hidden from clients
    min: i32,
    max: i32,
    attempts: u32,
    won: bool,
    difficulty: Difficulty,
    feasible_low: i32,
    feasible_high: i32,
}

impl GameState {
    pub fn start(min: i64, max: i64) -> Result<Self, ConfigError> {
        Self::start_with_rng(min, max, &mut rand::thread_rng())
    }

    pub fn start_with_rng<R: Rng + ?Sized>(
        min: i64,
        max: i64,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let (min, max) = validate_range(min, max)?;
        let secret = rng.gen_range(min..=max);
        Ok(Self::fresh(min, max, secret))
    }

    /// Game with a known secret, for replays and tests
    pub fn with_secret(min: i64, max: i64, secret: i32) -> Result<Self, ConfigError> {
        let (min, max) = validate_range(min, max)?;
        if secret < min || secret > max {
            return Err(ConfigError::SecretOutOfRange { secret, min, max });
        }
        Ok(Self::fresh(min, max, secret))
    }

    /// Starts a preset game, or a custom one over `custom_range`
    pub fn start_difficulty(
        difficulty: Difficulty,
        custom_range: Option<(i64, i64)>,
    ) -> Result<Self, ConfigError> {
        let (min, max) = match difficulty.preset_range() {
            Some((min, max)) => (i64::from(min), i64::from(max)),
            None => custom_range.ok_or(ConfigError::MissingCustomRange)?,
        };

        let mut state = Self::start(min, max)?;
        state.difficulty = difficulty;
        Ok(state)
    }

    /// Same bounds and difficulty, new secret
    pub fn restart(&self) -> Self {
        let secret = rand::thread_rng().gen_range(self.min..=self.max);
        let mut state = Self::fresh(self.min, self.max, secret);
        state.difficulty = self.difficulty;
        state
    }

    fn fresh(min: i32, max: i32, secret: i32) -> Self {
        Self {
            secret,
            min,
            max,
            attempts: 0,
            won: false,
            difficulty: Difficulty::for_range(min, max),
            feasible_low: min,
            feasible_high: max,
        }
    }

    pub fn guess(&self, value: i64) -> Result<(Self, GuessOutcome), ValidationError> {
        if self.won {
            return Err(ValidationError::GameOver);
        }
        if value < i64::from(self.min) || value > i64::from(self.max) {
            return Err(ValidationError::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            });
        }

        // In range, so it fits the game's integer width
        let value = value as i32;
        let mut next = self.clone();
        next.attempts += 1;

        let outcome = if value < self.secret {
            next.feasible_low = next.feasible_low.max(value + 1);
            GuessOutcome::TooLow
        } else if value > self.secret {
            next.feasible_high = next.feasible_high.min(value - 1);
            GuessOutcome::TooHigh
        } else {
            next.won = true;
            GuessOutcome::Correct
        };

        debug!(
            "Guess {} -> {:?} (attempt {}, feasible {}~{})",
            value, outcome, next.attempts, next.feasible_low, next.feasible_high
        );

        Ok((next, outcome))
    }

    /// Percentage of the starting range that has been ruled out, rounded to
    /// two decimals.
    pub fn progress(&self) -> f64 {
        let total = f64::from(self.max - self.min + 1);
        let remaining = f64::from(self.feasible_high - self.feasible_low + 1);
        let done = (total - remaining).max(0.0);
        (10_000.0 * done / total).round() / 100.0
    }

    pub fn board_label(&self) -> String {
        self.difficulty.board_label(self.min, self.max)
    }

    /// The score a player may record for this game, once it has been won
    pub fn winning_score(&self, name: String) -> Result<NewScore, ValidationError> {
        if !self.won {
            return Err(ValidationError::GameNotWon);
        }

        Ok(NewScore {
            name,
            attempts: self.attempts,
            difficulty: self.board_label(),
            range_low: self.min,
            range_high: self.max,
        })
    }

    pub fn revealed_secret(&self) -> Option<i32> {
        self.won.then_some(self.secret)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            difficulty: self.difficulty,
            label: self.board_label(),
            min: self.min,
            max: self.max,
            feasible_low: self.feasible_low,
            feasible_high: self.feasible_high,
            attempts: self.attempts,
            won: self.won,
            progress: self.progress(),
            revealed_secret: self.revealed_secret(),
        }
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_won(&self) -> bool {
        self.won
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn feasible_range(&self) -> (i32, i32) {
        (self.feasible_low, self.feasible_high)
    }
}
