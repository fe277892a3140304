use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

use crate::session::{CSRF_HEADER, SESSION_COOKIE, SessionManager};
use game_persistence::ScoreStore;
use game_types::{GuessRequest, StartGameRequest, SubmitScoreRequest};

pub mod config;
pub mod error;
pub mod handlers;
pub mod session;

use handlers::LeaderboardQuery;

const MAX_BODY_BYTES: u64 = 16 * 1024;

fn json_body<T: DeserializeOwned + Send>()
-> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

pub fn create_routes(
    session_manager: Arc<SessionManager>,
    score_store: Arc<dyn ScoreStore>,
    leaderboard_size: usize,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    // Clone for filters
    let session_filter = warp::any().map({
        let session_manager = session_manager.clone();
        move || session_manager.clone()
    });

    let store_filter = warp::any().map({
        let score_store = score_store.clone();
        move || score_store.clone()
    });

    let session_cookie = warp::cookie::optional::<String>(SESSION_COOKIE);
    let csrf_header = warp::header::optional::<String>(CSRF_HEADER);

    // Session bootstrap: hands out the cookie and CSRF token
    let session = warp::path!("session")
        .and(warp::get())
        .and(session_cookie.clone())
        .and(session_filter.clone())
        .and(store_filter.clone())
        .and_then(handlers::handle_session_request);

    let start_game = warp::path!("game")
        .and(warp::post())
        .and(session_cookie.clone())
        .and(csrf_header.clone())
        .and(json_body::<StartGameRequest>())
        .and(session_filter.clone())
        .and_then(handlers::handle_start_game);

    let guess = warp::path!("game" / "guess")
        .and(warp::post())
        .and(session_cookie.clone())
        .and(csrf_header.clone())
        .and(json_body::<GuessRequest>())
        .and(session_filter.clone())
        .and_then(handlers::handle_guess);

    let reset = warp::path!("game" / "reset")
        .and(warp::post())
        .and(session_cookie.clone())
        .and(csrf_header.clone())
        .and(session_filter.clone())
        .and_then(handlers::handle_reset);

    let submit_score = warp::path!("scores")
        .and(warp::post())
        .and(session_cookie)
        .and(csrf_header)
        .and(json_body::<SubmitScoreRequest>())
        .and(session_filter)
        .and(store_filter.clone())
        .and_then(handlers::handle_submit_score);

    let leaderboard = warp::path!("leaderboard")
        .and(warp::get())
        .and(warp::query::<LeaderboardQuery>())
        .and(warp::any().map(move || leaderboard_size))
        .and(store_filter.clone())
        .and_then(handlers::handle_leaderboard_request);

    let health = warp::path!("healthz")
        .and(warp::get())
        .and(store_filter)
        .and_then(handlers::handle_health_request);

    session
        .or(start_game)
        .or(guess)
        .or(reset)
        .or(submit_score)
        .or(leaderboard)
        .or(health)
        .recover(handlers::handle_rejection)
        .with(warp::log("number_guess"))
}
