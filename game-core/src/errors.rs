use thiserror::Error;

/// Invalid game setup. Fatal to starting the game it describes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("range must satisfy 1 <= low < high <= 10000000, got {low} ~ {high}")]
    InvalidRange { low: i64, high: i64 },
    #[error("secret {secret} lies outside {min} ~ {max}")]
    SecretOutOfRange { secret: i32, min: i32, max: i32 },
    #[error("a custom game needs both low and high bounds")]
    MissingCustomRange,
}

/// Rejected player input. The caller re-prompts; game state is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter a whole number, got {input:?}")]
    NotANumber { input: String },
    #[error("please enter a whole number between {min} and {max}")]
    OutOfRange { value: i64, min: i32, max: i32 },
    #[error("this game is already won, start a new one")]
    GameOver,
    #[error("the current game has not been won yet")]
    GameNotWon,
    #[error("names are limited to 20 characters")]
    NameTooLong,
    #[error("names may only contain Chinese characters, letters, digits, spaces, '-' and '_'")]
    NameCharacters,
}
