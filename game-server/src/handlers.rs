use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use warp::http::header::SET_COOKIE;
use warp::http::{HeaderValue, StatusCode};
use warp::reply::Response;
use warp::{Rejection, Reply};

use game_core::{GameState, ValidationError, parse_guess, validate_player_name};
use game_persistence::ScoreStore;
use game_types::{
    ErrorKind, ErrorResponse, GameSnapshot, GuessInput, GuessOutcome, GuessRequest,
    GuessResponse, HealthResponse, LeaderboardGroup, LeaderboardResponse, ScoreEntry,
    SessionResponse, StartGameRequest, SubmitScoreRequest,
};

use crate::error::ApiError;
use crate::session::{SessionHandle, SessionManager};

pub const MAX_LEADERBOARD_SIZE: usize = 100;

type ApiResult<T> = Result<(StatusCode, T), ApiError>;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
    pub difficulty: Option<String>,
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn error_response(err: &ApiError) -> Response {
    if err.status().is_server_error() {
        error!("Request failed: {}", err);
    } else {
        debug!("Request rejected: {}", err);
    }
    json_response(err.status(), &err.to_response())
}

/// Renders the outcome and refreshes the session cookie
fn finish<T: Serialize>(handle: &SessionHandle, result: ApiResult<T>) -> Response {
    let mut response = match result {
        Ok((status, body)) => json_response(status, &body),
        Err(err) => error_response(&err),
    };

    match HeaderValue::from_str(&handle.cookie()) {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Err(e) => warn!("Could not encode session cookie: {}", e),
    }
    response
}

/// Mutating routes only act on a session opened by `GET /session`. Without
/// one there is no CSRF token to match, so the request is refused.
async fn existing_session(
    sessions: &SessionManager,
    cookie: Option<String>,
) -> Result<SessionHandle, ApiError> {
    sessions.resume(cookie).await?.ok_or(ApiError::Csrf)
}

fn outcome_message(outcome: GuessOutcome, game: &GameState) -> String {
    match outcome {
        GuessOutcome::TooLow => "Too low, try a bigger number".to_string(),
        GuessOutcome::TooHigh => "Too high, try a smaller number".to_string(),
        GuessOutcome::Correct => format!(
            "Correct! The answer was {}, found in {} attempts",
            game.revealed_secret().unwrap_or_default(),
            game.attempts()
        ),
    }
}

pub async fn handle_session_request(
    cookie: Option<String>,
    sessions: Arc<SessionManager>,
    store: Arc<dyn ScoreStore>,
) -> Result<impl Reply, Rejection> {
    let handle = match sessions.resume_or_create(cookie).await {
        Ok(handle) => handle,
        Err(err) => return Ok(error_response(&err.into())),
    };

    let backend = store.backend().to_string();
    let result = sessions
        .with_session(handle.id, |session| SessionResponse {
            csrf_token: session.csrf_token.clone(),
            game: session.game.as_ref().map(GameState::snapshot),
            backend,
        })
        .await
        .map(|body| (StatusCode::OK, body))
        .map_err(ApiError::from);

    Ok(finish(&handle, result))
}

pub async fn handle_start_game(
    cookie: Option<String>,
    csrf: Option<String>,
    request: StartGameRequest,
    sessions: Arc<SessionManager>,
) -> Result<impl Reply, Rejection> {
    let handle = match existing_session(&sessions, cookie).await {
        Ok(handle) => handle,
        Err(err) => return Ok(error_response(&err)),
    };

    let result = start_game(&sessions, &handle, csrf.as_deref(), request).await;
    Ok(finish(&handle, result))
}

async fn start_game(
    sessions: &SessionManager,
    handle: &SessionHandle,
    csrf: Option<&str>,
    request: StartGameRequest,
) -> ApiResult<GameSnapshot> {
    let custom_range = match (request.low, request.high) {
        (Some(low), Some(high)) => Some((i64::from(low), i64::from(high))),
        _ => None,
    };

    sessions
        .with_session(handle.id, |session| -> ApiResult<GameSnapshot> {
            if !session.csrf_matches(csrf) {
                return Err(ApiError::Csrf);
            }

            let game = GameState::start_difficulty(request.difficulty, custom_range)?;
            info!("Session {} started a {} game", session.id, game.board_label());

            let snapshot = game.snapshot();
            session.game = Some(game);
            Ok((StatusCode::CREATED, snapshot))
        })
        .await?
}

pub async fn handle_guess(
    cookie: Option<String>,
    csrf: Option<String>,
    request: GuessRequest,
    sessions: Arc<SessionManager>,
) -> Result<impl Reply, Rejection> {
    let handle = match existing_session(&sessions, cookie).await {
        Ok(handle) => handle,
        Err(err) => return Ok(error_response(&err)),
    };

    let result = submit_guess(&sessions, &handle, csrf.as_deref(), request).await;
    Ok(finish(&handle, result))
}

async fn submit_guess(
    sessions: &SessionManager,
    handle: &SessionHandle,
    csrf: Option<&str>,
    request: GuessRequest,
) -> ApiResult<GuessResponse> {
    sessions
        .with_session(handle.id, |session| -> ApiResult<GuessResponse> {
            if !session.csrf_matches(csrf) {
                return Err(ApiError::Csrf);
            }

            let value = match &request.guess {
                GuessInput::Number(value) => *value,
                GuessInput::Text(text) => parse_guess(text)?,
            };

            // A rejected guess leaves the stored game as it was
            let (next, outcome) = session.ensure_game()?.guess(value)?;
            let response = GuessResponse {
                outcome,
                message: outcome_message(outcome, &next),
                game: next.snapshot(),
            };

            if outcome == GuessOutcome::Correct {
                info!(
                    "Session {} won a {} game in {} attempts",
                    session.id,
                    next.board_label(),
                    next.attempts()
                );
            }
            session.game = Some(next);
            Ok((StatusCode::OK, response))
        })
        .await?
}

pub async fn handle_reset(
    cookie: Option<String>,
    csrf: Option<String>,
    sessions: Arc<SessionManager>,
) -> Result<impl Reply, Rejection> {
    let handle = match existing_session(&sessions, cookie).await {
        Ok(handle) => handle,
        Err(err) => return Ok(error_response(&err)),
    };

    let csrf = csrf.as_deref();
    let result = sessions
        .with_session(handle.id, |session| -> ApiResult<GameSnapshot> {
            if !session.csrf_matches(csrf) {
                return Err(ApiError::Csrf);
            }

            let game = session.ensure_game()?;
            *game = game.restart();
            Ok((StatusCode::OK, game.snapshot()))
        })
        .await
        .map_err(ApiError::from)
        .and_then(|result| result);

    Ok(finish(&handle, result))
}

pub async fn handle_submit_score(
    cookie: Option<String>,
    csrf: Option<String>,
    request: SubmitScoreRequest,
    sessions: Arc<SessionManager>,
    store: Arc<dyn ScoreStore>,
) -> Result<impl Reply, Rejection> {
    let handle = match existing_session(&sessions, cookie).await {
        Ok(handle) => handle,
        Err(err) => return Ok(error_response(&err)),
    };

    let result = submit_score(&sessions, store.as_ref(), &handle, csrf.as_deref(), request).await;
    Ok(finish(&handle, result))
}

async fn submit_score(
    sessions: &SessionManager,
    store: &dyn ScoreStore,
    handle: &SessionHandle,
    csrf: Option<&str>,
    request: SubmitScoreRequest,
) -> ApiResult<ScoreEntry> {
    // Take the won game out of the session so it can only be recorded once
    let (score, game) = sessions
        .with_session(handle.id, |session| -> Result<_, ApiError> {
            if !session.csrf_matches(csrf) {
                return Err(ApiError::Csrf);
            }

            let name = validate_player_name(request.name.as_deref())?;
            let game = session.game.take().ok_or(ValidationError::GameNotWon)?;
            match game.winning_score(name) {
                Ok(score) => Ok((score, game)),
                Err(err) => {
                    session.game = Some(game);
                    Err(err.into())
                }
            }
        })
        .await??;

    match store.record(score).await {
        Ok(entry) => {
            info!(
                "Recorded {} attempts for {} on the {} board",
                entry.attempts, entry.name, entry.difficulty
            );
            Ok((StatusCode::CREATED, entry))
        }
        Err(err) => {
            // Give the won game back so the player can retry the submission,
            // even if another request started a new game in the meantime
            sessions
                .with_session(handle.id, |session| {
                    if session.game.replace(game).is_some() {
                        warn!(
                            "Session {} dropped a game started during a failed submission",
                            session.id
                        );
                    }
                })
                .await?;
            Err(err.into())
        }
    }
}

pub async fn handle_leaderboard_request(
    query: LeaderboardQuery,
    default_size: usize,
    store: Arc<dyn ScoreStore>,
) -> Result<impl Reply, Rejection> {
    let limit = query
        .limit
        .unwrap_or(default_size)
        .min(MAX_LEADERBOARD_SIZE);

    let groups = match &query.difficulty {
        Some(difficulty) => store
            .top_scores_for(difficulty, limit)
            .await
            .map(|entries| vec![(difficulty.clone(), entries)]),
        None => store.grouped(limit).await,
    };

    match groups {
        Ok(groups) => {
            let response = LeaderboardResponse {
                backend: store.backend().to_string(),
                groups: groups
                    .into_iter()
                    .map(|(difficulty, entries)| LeaderboardGroup::ranked(difficulty, entries))
                    .collect(),
            };
            Ok(json_response(StatusCode::OK, &response))
        }
        Err(err) => Ok(error_response(&err.into())),
    }
}

pub async fn handle_health_request(store: Arc<dyn ScoreStore>) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&HealthResponse {
        ok: true,
        backend: store.backend().to_string(),
    }))
}

/// Turns warp's own rejections into the JSON error shape used everywhere else
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, kind, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, ErrorKind::NotFound, "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, ErrorKind::InvalidInput, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, ErrorKind::InvalidInput, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, ErrorKind::InvalidInput, e.to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::InvalidInput,
            "Request body must be JSON".to_string(),
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            ErrorKind::InvalidInput,
            "Content-Length header is required".to_string(),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::InvalidInput,
            "Request body too large".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::InvalidInput,
            "Method not allowed".to_string(),
        )
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Internal,
            "Internal server error".to_string(),
        )
    };

    let body = ErrorResponse {
        kind,
        error: message,
    };
    Ok(json_response(status, &body))
}
