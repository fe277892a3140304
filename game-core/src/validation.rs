use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{ConfigError, ValidationError};

pub const MIN_BOUND: i64 = 1;
pub const MAX_BOUND: i64 = 10_000_000;
pub const MAX_NAME_CHARS: usize = 20;
pub const ANONYMOUS_NAME: &str = "Anonymous";

// CJK unified ideographs, ASCII alphanumerics, space, '-' and '_'
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\x{4e00}-\x{9fa5}A-Za-z0-9_\- ]*$").expect("name pattern compiles")
});

/// Checks `MIN_BOUND <= low < high <= MAX_BOUND` and narrows to the game's
/// integer width.
pub fn validate_range(low: i64, high: i64) -> Result<(i32, i32), ConfigError> {
    if low < MIN_BOUND || high > MAX_BOUND || low >= high {
        return Err(ConfigError::InvalidRange { low, high });
    }

    Ok((low as i32, high as i32))
}

/// Normalises a leaderboard name. Blank or missing names become
/// [`ANONYMOUS_NAME`].
pub fn validate_player_name(name: Option<&str>) -> Result<String, ValidationError> {
    let trimmed = name.map(str::trim).unwrap_or_default();

    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::NameTooLong);
    }
    if !NAME_PATTERN.is_match(trimmed) {
        return Err(ValidationError::NameCharacters);
    }

    if trimmed.is_empty() {
        Ok(ANONYMOUS_NAME.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn parse_guess(input: &str) -> Result<i64, ValidationError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::NotANumber {
            input: input.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_bounds() {
        assert_eq!(validate_range(1, 100), Ok((1, 100)));
        assert_eq!(validate_range(1, MAX_BOUND), Ok((1, 10_000_000)));
        assert!(validate_range(5, 5).is_err());
        assert!(validate_range(10, 1).is_err());
        assert!(validate_range(0, 10).is_err());
        assert!(validate_range(1, MAX_BOUND + 1).is_err());
    }

    #[test]
    fn test_name_defaults_to_anonymous() {
        assert_eq!(validate_player_name(None).unwrap(), ANONYMOUS_NAME);
        assert_eq!(validate_player_name(Some("   ")).unwrap(), ANONYMOUS_NAME);
    }

    #[test]
    fn test_name_whitelist() {
        assert_eq!(validate_player_name(Some("  Ada_L-1 ")).unwrap(), "Ada_L-1");
        assert_eq!(validate_player_name(Some("玩家 一号")).unwrap(), "玩家 一号");

        assert_eq!(
            validate_player_name(Some("<script>")),
            Err(ValidationError::NameCharacters)
        );
        assert_eq!(
            validate_player_name(Some("bob@example")),
            Err(ValidationError::NameCharacters)
        );
    }

    #[test]
    fn test_name_length_counts_characters() {
        let twenty_cjk = "猜".repeat(20);
        assert!(validate_player_name(Some(&twenty_cjk)).is_ok());

        let too_long = "a".repeat(21);
        assert_eq!(
            validate_player_name(Some(&too_long)),
            Err(ValidationError::NameTooLong)
        );
    }

    #[test]
    fn test_parse_guess() {
        assert_eq!(parse_guess(" 42 "), Ok(42));
        assert_eq!(parse_guess("-3"), Ok(-3));
        assert!(matches!(
            parse_guess("forty"),
            Err(ValidationError::NotANumber { .. })
        ));
        assert!(parse_guess("").is_err());
        assert!(parse_guess("4.5").is_err());
    }
}
